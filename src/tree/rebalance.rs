use std::cmp;

use log::trace;

use super::{BalancedTree, Link, Node, NodePtr};

impl BalancedTree {
    /// Walks from `start_from` up to the root, refreshing heights and restoring
    /// the AVL condition at every level.
    /// Returns the number of rebalance operations: one per single rotation,
    /// two per double rotation.
    pub(super) fn rebalance_upward(&mut self, start_from: Link) -> usize {
        let mut rebalances = 0;
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let (subtree_ptr, cost) = self.rebalance_node(node_ptr);
            rebalances += cost;
            current = unsafe { subtree_ptr.as_ref().parent };
        }
        rebalances
    }

    /// Restores the AVL condition at the given node if necessary and adjusts its height.
    /// Children must already satisfy the condition, and their heights may differ by at most 2.
    /// Returns the root of the (possibly rotated) subtree and the rebalance cost.
    fn rebalance_node(&mut self, node_ptr: NodePtr) -> (NodePtr, usize) {
        let (left, right) = unsafe { (node_ptr.as_ref().left, node_ptr.as_ref().right) };
        let balance = Node::balance_factor(node_ptr);
        debug_assert!((-2..=2).contains(&balance));

        if balance <= -2 {
            // Right heavy
            if right.map_or(0, Node::balance_factor) >= 1 {
                (self.rotate_right_then_left(node_ptr), 2)
            } else {
                (self.rotate_left(node_ptr), 1)
            }
        } else if balance >= 2 {
            // Left heavy
            if left.map_or(0, Node::balance_factor) <= -1 {
                (self.rotate_left_then_right(node_ptr), 2)
            } else {
                (self.rotate_right(node_ptr), 1)
            }
        } else {
            Node::update(node_ptr);
            (node_ptr, 0)
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr) -> NodePtr {
        unsafe {
            let Some(mut right_ptr) = node_ptr.as_ref().right else {
                return node_ptr;
            };
            trace!("rotate left at key {}", node_ptr.as_ref().key);

            node_ptr.as_mut().right = right_ptr.as_ref().left;
            if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                right_left_ptr.as_mut().parent = Some(node_ptr);
            }

            self.replace_child(node_ptr.as_ref().parent, node_ptr, Some(right_ptr));

            right_ptr.as_mut().left = Some(node_ptr);
            node_ptr.as_mut().parent = Some(right_ptr);

            Node::update(node_ptr);
            Node::update(right_ptr);
            right_ptr
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr) -> NodePtr {
        unsafe {
            let Some(mut left_ptr) = node_ptr.as_ref().left else {
                return node_ptr;
            };
            trace!("rotate right at key {}", node_ptr.as_ref().key);

            node_ptr.as_mut().left = left_ptr.as_ref().right;
            if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                left_right_ptr.as_mut().parent = Some(node_ptr);
            }

            self.replace_child(node_ptr.as_ref().parent, node_ptr, Some(left_ptr));

            left_ptr.as_mut().right = Some(node_ptr);
            node_ptr.as_mut().parent = Some(left_ptr);

            Node::update(node_ptr);
            Node::update(left_ptr);
            left_ptr
        }
    }

    fn rotate_right_then_left(&mut self, node_ptr: NodePtr) -> NodePtr {
        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            self.rotate_right(right_ptr);
        }
        self.rotate_left(node_ptr)
    }

    fn rotate_left_then_right(&mut self, node_ptr: NodePtr) -> NodePtr {
        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            self.rotate_left(left_ptr);
        }
        self.rotate_right(node_ptr)
    }
}

impl Node {
    /// Height of the left subtree minus height of the right subtree.
    fn balance_factor(node_ptr: NodePtr) -> i32 {
        unsafe { Self::height_of(node_ptr.as_ref().left) - Self::height_of(node_ptr.as_ref().right) }
    }

    /// Recomputes height and subtree size from the children.
    pub(super) fn update(mut node_ptr: NodePtr) {
        unsafe {
            let (left, right) = (node_ptr.as_ref().left, node_ptr.as_ref().right);
            let node = node_ptr.as_mut();
            node.height = cmp::max(Self::height_of(left), Self::height_of(right)) + 1;
            node.len = Self::len_of(left) + Self::len_of(right) + 1;
        }
    }
}
