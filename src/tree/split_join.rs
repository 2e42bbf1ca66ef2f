use log::debug;

use super::{BalancedTree, Link, Node, NodePtr};
use crate::error::{Result, TreeError};

impl BalancedTree {
    /// Joins `other` and the separator entry into this tree.
    ///
    /// All keys of `other` together with `key` must lie strictly above or
    /// strictly below all keys of this tree; otherwise the join is rejected with
    /// [`TreeError::OverlappingRanges`], this tree is left unchanged and `other`
    /// is dropped.
    ///
    /// Returns the join complexity `|height(self) - height(other)| + 1`, taken
    /// from the heights before joining (empty trees have height -1).
    pub fn join(&mut self, key: i32, value: impl Into<String>, other: BalancedTree) -> Result<usize> {
        let self_is_low = self.separated_by(key, &other)?;
        let complexity = (self.height() - other.height()).unsigned_abs() as usize + 1;

        let separator_ptr = Node::create(None, key, value.into());
        let (min, max) = if self_is_low {
            (self.min, other.max)
        } else {
            (other.min, self.max)
        };
        let rebalances = self.concat(separator_ptr, other, self_is_low);
        self.min = min.or(Some(separator_ptr));
        self.max = max.or(Some(separator_ptr));

        debug!("joined on key {key}: complexity {complexity}, {rebalances} rebalance operations");
        Ok(complexity)
    }

    /// Splits the tree at `key`, which must be present.
    ///
    /// Returns the trees holding all keys smaller and all keys larger than
    /// `key`; the entry for `key` itself is dropped. The nodes of this tree are
    /// reused by the two results.
    pub fn split(mut self, key: i32) -> Result<(BalancedTree, BalancedTree)> {
        let node_ptr = self.find_present(key)?;
        let (parent, left, right) = unsafe {
            let node = node_ptr.as_ref();
            (node.parent, node.left, node.right)
        };

        // Extremes of both halves are known up front.
        let smaller_max = Node::prev(node_ptr);
        let larger_min = Node::next(node_ptr);
        let mut smaller = Self::from_detached(left);
        smaller.min = smaller_max.and(self.min);
        smaller.max = smaller_max;
        let mut larger = Self::from_detached(right);
        larger.min = larger_min;
        larger.max = larger_min.and(self.max);

        // Walk up to the root, folding each ancestor and the subtree hanging
        // off its other side into the half it belongs to.
        let mut child_ptr = node_ptr;
        let mut current = parent;
        while let Some(mut ancestor_ptr) = current {
            let (next, sibling, from_right) = unsafe {
                let ancestor = ancestor_ptr.as_mut();
                let from_right = ancestor.right == Some(child_ptr);
                let sibling = if from_right {
                    ancestor.left
                } else {
                    ancestor.right
                };
                let next = ancestor.parent;
                ancestor.left = None;
                ancestor.right = None;
                ancestor.parent = None;
                (next, sibling, from_right)
            };

            let sibling_tree = Self::from_detached(sibling);
            if from_right {
                smaller.concat(ancestor_ptr, sibling_tree, false);
            } else {
                larger.concat(ancestor_ptr, sibling_tree, true);
            }

            child_ptr = ancestor_ptr;
            current = next;
        }

        // Every node has been handed over; only the split node remains.
        self.root = None;
        self.num_nodes = 0;
        self.min = None;
        self.max = None;
        unsafe { Node::destroy(node_ptr) };

        debug_assert_eq!(Node::len_of(smaller.root), smaller.num_nodes);
        debug_assert_eq!(Node::len_of(larger.root), larger.num_nodes);
        debug!(
            "split on key {key}: {} smaller, {} larger",
            smaller.num_nodes, larger.num_nodes
        );
        Ok((smaller, larger))
    }

    /// Wraps a subtree cut loose from its parent.
    /// The cached min/max links are left for the caller to set.
    fn from_detached(root: Link) -> Self {
        if let Some(mut root_ptr) = root {
            unsafe { root_ptr.as_mut().parent = None };
        }
        Self {
            root,
            num_nodes: Node::len_of(root),
            min: None,
            max: None,
        }
    }

    /// Checks that `key` and `other` lie entirely on one side of this tree.
    /// Returns whether this tree holds the lower keys.
    fn separated_by(&self, key: i32, other: &BalancedTree) -> Result<bool> {
        let below = |tree: &BalancedTree| tree.max_key().map_or(true, |max_key| max_key < key);
        let above = |tree: &BalancedTree| tree.min_key().map_or(true, |min_key| min_key > key);
        if below(self) && above(other) {
            Ok(true)
        } else if above(self) && below(other) {
            Ok(false)
        } else {
            Err(TreeError::OverlappingRanges(key))
        }
    }

    /// Links this tree, the detached separator node and `other` into one tree,
    /// taking over all nodes of `other`. Cached min/max links are not touched.
    /// Returns the number of rebalance operations.
    fn concat(&mut self, mut separator_ptr: NodePtr, mut other: BalancedTree, self_is_low: bool) -> usize {
        let other_root = other.root.take();
        self.num_nodes += other.num_nodes + 1;

        let (low, high) = if self_is_low {
            (self.root, other_root)
        } else {
            (other_root, self.root)
        };
        let low_height = Node::height_of(low);
        let high_height = Node::height_of(high);

        if (low_height - high_height).abs() <= 1 {
            Node::attach(separator_ptr, low, high);
            unsafe { separator_ptr.as_mut().parent = None };
            self.root = Some(separator_ptr);
            return 0;
        }

        unsafe {
            if low_height > high_height {
                // Descend the right spine of the taller, lower tree
                let mut parent = None;
                let mut current = low;
                while let Some(node_ptr) = current {
                    if node_ptr.as_ref().height <= high_height + 1 {
                        break;
                    }
                    parent = current;
                    current = node_ptr.as_ref().right;
                }
                Node::attach(separator_ptr, current, high);
                separator_ptr.as_mut().parent = parent;
                if let Some(mut parent_ptr) = parent {
                    parent_ptr.as_mut().right = Some(separator_ptr);
                }
                self.root = low;
            } else {
                // Descend the left spine of the taller, higher tree
                let mut parent = None;
                let mut current = high;
                while let Some(node_ptr) = current {
                    if node_ptr.as_ref().height <= low_height + 1 {
                        break;
                    }
                    parent = current;
                    current = node_ptr.as_ref().left;
                }
                Node::attach(separator_ptr, low, current);
                separator_ptr.as_mut().parent = parent;
                if let Some(mut parent_ptr) = parent {
                    parent_ptr.as_mut().left = Some(separator_ptr);
                }
                self.root = high;
            }
        }

        self.rebalance_upward(Some(separator_ptr))
    }
}

impl Node {
    /// Makes `left` and `right` the children of `node_ptr` and refreshes it.
    fn attach(mut node_ptr: NodePtr, left: Link, right: Link) {
        unsafe {
            for mut child_ptr in left.into_iter().chain(right) {
                child_ptr.as_mut().parent = Some(node_ptr);
            }
            let node = node_ptr.as_mut();
            node.left = left;
            node.right = right;
        }
        Node::update(node_ptr);
    }
}
