//! An integer-keyed ordered map backed by an AVL tree.

use std::cmp;
use std::fmt;
use std::ptr::NonNull;

use log::debug;

use crate::error::{Result, TreeError};
use crate::iter::Iter;

mod rebalance;
mod split_join;

/// An ordered map from `i32` keys to `String` values, kept height balanced.
///
/// Besides the usual map operations the tree supports [`split`] and [`join`],
/// both of which consume the tree structure they are handed.
///
/// [`split`]: BalancedTree::split
/// [`join`]: BalancedTree::join
pub struct BalancedTree {
    root: Link,
    num_nodes: usize,
    min: Link,
    max: Link,
}

pub(crate) struct Node {
    pub(crate) key: i32,
    pub(crate) value: String,
    left: Link,
    right: Link,
    parent: Link,
    height: i32,
    len: usize,
}

pub(crate) type NodePtr = NonNull<Node>;
pub(crate) type Link = Option<NodePtr>;
type LinkPtr = NonNull<Link>;

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

// SAFETY: a tree exclusively owns every node reachable from its root, and the
// cached min/max links only ever point into that same set of nodes.
unsafe impl Send for BalancedTree {}

impl BalancedTree {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            min: None,
            max: None,
        }
    }

    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the root node, or -1 if the tree is empty.
    pub fn height(&self) -> i32 {
        Node::height_of(self.root)
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe { Node::destroy(node_ptr) });
        self.root = None;
        self.num_nodes = 0;
        self.min = None;
        self.max = None;
    }

    /// Returns the value stored under the key.
    pub fn search(&self, key: i32) -> Option<&str> {
        self.find(key)
            .map(|node_ptr| unsafe { &*node_ptr.as_ptr() }.value.as_str())
    }

    /// Returns true if the tree contains the key.
    pub fn contains(&self, key: i32) -> bool {
        self.find(key).is_some()
    }

    /// Returns the value stored under the smallest key.
    pub fn min(&self) -> Option<&str> {
        self.min
            .map(|node_ptr| unsafe { &*node_ptr.as_ptr() }.value.as_str())
    }

    /// Returns the value stored under the largest key.
    pub fn max(&self) -> Option<&str> {
        self.max
            .map(|node_ptr| unsafe { &*node_ptr.as_ptr() }.value.as_str())
    }

    /// Returns the smallest key.
    pub fn min_key(&self) -> Option<i32> {
        self.min.map(|node_ptr| unsafe { node_ptr.as_ref().key })
    }

    /// Returns the largest key.
    pub fn max_key(&self) -> Option<i32> {
        self.max.map(|node_ptr| unsafe { node_ptr.as_ref().key })
    }

    /// Returns all keys in ascending order.
    pub fn keys_in_order(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.num_nodes);
        self.inorder(|node_ptr| keys.push(unsafe { node_ptr.as_ref().key }));
        keys
    }

    /// Returns all values, ordered by their keys.
    pub fn values_in_order(&self) -> Vec<&str> {
        let mut values = Vec::with_capacity(self.num_nodes);
        self.inorder(|node_ptr| values.push(unsafe { &*node_ptr.as_ptr() }.value.as_str()));
        values
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.min, self.num_nodes)
    }

    /// Inserts a key-value pair into the tree.
    ///
    /// Returns the number of rebalance operations performed: one per single
    /// rotation, two per double rotation. An existing key is left untouched and
    /// reported as [`TreeError::DuplicateKey`].
    pub fn insert(&mut self, key: i32, value: impl Into<String>) -> Result<usize> {
        let (parent, mut link_ptr) = self
            .find_insert_pos(key)
            .ok_or(TreeError::DuplicateKey(key))?;

        let node_ptr = Node::create(parent, key, value.into());
        unsafe {
            *link_ptr.as_mut() = Some(node_ptr);
        }
        self.num_nodes += 1;

        if self.min_key().map_or(true, |min_key| key < min_key) {
            self.min = Some(node_ptr);
        }
        if self.max_key().map_or(true, |max_key| key > max_key) {
            self.max = Some(node_ptr);
        }

        let rebalances = self.rebalance_upward(Some(node_ptr));
        debug!("inserted key {key} with {rebalances} rebalance operations");
        Ok(rebalances)
    }

    /// Removes a key from the tree.
    ///
    /// Returns the number of rebalance operations performed, or
    /// [`TreeError::KeyNotFound`] if the key is absent.
    pub fn delete(&mut self, key: i32) -> Result<usize> {
        let node_ptr = self.find(key).ok_or(TreeError::KeyNotFound(key))?;
        debug_assert!(self.num_nodes >= 1);

        // Cached extremes move before the node is unlinked.
        if self.max == Some(node_ptr) {
            self.max = Node::prev(node_ptr);
        }
        if self.min == Some(node_ptr) {
            self.min = Node::next(node_ptr);
        }
        self.num_nodes -= 1;

        let rebalance_from = self.unlink_node(node_ptr);
        unsafe { Node::destroy(node_ptr) };

        let rebalances = self.rebalance_upward(rebalance_from);
        debug!("deleted key {key} with {rebalances} rebalance operations");
        Ok(rebalances)
    }

    /// Returns the key preceding `key`, or `None` if `key` is the smallest.
    pub fn predecessor(&self, key: i32) -> Result<Option<i32>> {
        let node_ptr = self.find_present(key)?;
        Ok(Node::prev(node_ptr).map(|prev_ptr| unsafe { prev_ptr.as_ref().key }))
    }

    /// Returns the key following `key`, or `None` if `key` is the largest.
    pub fn successor(&self, key: i32) -> Result<Option<i32>> {
        let node_ptr = self.find_present(key)?;
        Ok(Node::next(node_ptr).map(|next_ptr| unsafe { next_ptr.as_ref().key }))
    }

    /// Returns true if every node's subtrees differ in height by at most one.
    pub fn is_avl(&self) -> bool {
        let mut balanced = true;
        self.preorder(|node_ptr| {
            let (left, right) = unsafe { (node_ptr.as_ref().left, node_ptr.as_ref().right) };
            balanced &= (Node::height_of(left) - Node::height_of(right)).abs() <= 1;
        });
        balanced
    }

    /// Returns true if an in-order walk yields strictly increasing keys.
    pub fn is_bst(&self) -> bool {
        let mut ordered = true;
        let mut prev_key: Option<i32> = None;
        self.inorder(|node_ptr| {
            let key = unsafe { node_ptr.as_ref().key };
            ordered &= prev_key.map_or(true, |prev_key| prev_key < key);
            prev_key = Some(key);
        });
        ordered
    }

    /// Asserts every structural invariant of the tree.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                let node = node_ptr.as_ref();

                // Check link for left child node
                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                }

                // Check link for right child node
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                }

                // Check height and subtree size
                let left_height = Node::height_of(node.left);
                let right_height = Node::height_of(node.right);
                assert_eq!(node.height, cmp::max(left_height, right_height) + 1);
                assert_eq!(node.len, Node::len_of(node.left) + Node::len_of(node.right) + 1);

                // Check AVL condition (nearly balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
            assert_eq!(Node::len_of(self.root), self.num_nodes);

            // Check global order and cached extremes
            assert!(self.is_bst());
            assert_eq!(self.min, self.root.map(Node::leftmost));
            assert_eq!(self.max, self.root.map(Node::rightmost));
        }
    }

    fn find(&self, key: i32) -> Link {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(&node_ptr.as_ref().key) {
                    cmp::Ordering::Equal => break,
                    cmp::Ordering::Less => node_ptr.as_ref().left,
                    cmp::Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    fn find_present(&self, key: i32) -> Result<NodePtr> {
        if self.is_empty() {
            return Err(TreeError::EmptyTree);
        }
        self.find(key).ok_or(TreeError::KeyNotFound(key))
    }

    fn find_insert_pos(&mut self, key: i32) -> Option<(Link, LinkPtr)> {
        let mut parent: Link = None;
        let mut link_ptr: LinkPtr = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = link_ptr.as_ref() {
                if key == node_ptr.as_ref().key {
                    return None;
                }
                parent = *link_ptr.as_ref();
                if key < node_ptr.as_ref().key {
                    link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                } else {
                    link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                }
            }
        }
        Some((parent, link_ptr))
    }

    /// Points the slot holding `old_ptr` (a child slot of `parent`, or the
    /// root) at `new`, and re-parents `new`.
    fn replace_child(&mut self, parent: Link, old_ptr: NodePtr, new: Link) {
        unsafe {
            if let Some(mut new_ptr) = new {
                new_ptr.as_mut().parent = parent;
            }
            match parent {
                None => self.root = new,
                Some(mut parent_ptr) => {
                    if parent_ptr.as_ref().left == Some(old_ptr) {
                        parent_ptr.as_mut().left = new;
                    } else {
                        parent_ptr.as_mut().right = new;
                    }
                }
            }
        }
    }

    /// Detaches a node from the tree without deallocating it.
    /// Returns the lowest node whose subtree changed.
    fn unlink_node(&mut self, node_ptr: NodePtr) -> Link {
        let (parent, left, right) = unsafe {
            let node = node_ptr.as_ref();
            (node.parent, node.left, node.right)
        };

        match (left, right) {
            (None, None) => {
                self.replace_child(parent, node_ptr, None);
                parent
            }
            (Some(child_ptr), None) | (None, Some(child_ptr)) => {
                self.replace_child(parent, node_ptr, Some(child_ptr));
                parent
            }
            (Some(mut left_ptr), Some(mut right_ptr)) => unsafe {
                // Find smallest node in right subtree
                let mut succ_parent_ptr = node_ptr;
                let mut succ_ptr = right_ptr;
                while let Some(next_left_ptr) = succ_ptr.as_ref().left {
                    succ_parent_ptr = succ_ptr;
                    succ_ptr = next_left_ptr;
                }

                if succ_parent_ptr != node_ptr {
                    // Promote the successor's right subtree into its old slot
                    let succ_right = succ_ptr.as_ref().right;
                    succ_parent_ptr.as_mut().left = succ_right;
                    if let Some(mut succ_right_ptr) = succ_right {
                        succ_right_ptr.as_mut().parent = Some(succ_parent_ptr);
                    }
                    succ_ptr.as_mut().right = Some(right_ptr);
                    right_ptr.as_mut().parent = Some(succ_ptr);
                }

                succ_ptr.as_mut().left = Some(left_ptr);
                left_ptr.as_mut().parent = Some(succ_ptr);
                self.replace_child(parent, node_ptr, Some(succ_ptr));

                if succ_parent_ptr == node_ptr {
                    Some(succ_ptr)
                } else {
                    Some(succ_parent_ptr)
                }
            },
        }
    }

    fn preorder<F: FnMut(NodePtr)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn inorder<F: FnMut(NodePtr)>(&self, f: F) {
        self.traverse(|_| {}, f, |_| {});
    }

    fn postorder<F: FnMut(NodePtr)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr),
        In: FnMut(NodePtr),
        Post: FnMut(NodePtr),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl Drop for BalancedTree {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Default for BalancedTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BalancedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a BalancedTree {
    type Item = (i32, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Later duplicates of a key are skipped; the first value wins.
impl<S: Into<String>> Extend<(i32, S)> for BalancedTree {
    fn extend<I: IntoIterator<Item = (i32, S)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let _ = self.insert(key, value);
        }
    }
}

impl<S: Into<String>> FromIterator<(i32, S)> for BalancedTree {
    fn from_iter<I: IntoIterator<Item = (i32, S)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl Node {
    fn create(parent: Link, key: i32, value: String) -> NodePtr {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
            len: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    /// Height of a possibly absent subtree; absent subtrees have height -1.
    fn height_of(link: Link) -> i32 {
        link.map_or(-1, |node_ptr| unsafe { node_ptr.as_ref().height })
    }

    fn len_of(link: Link) -> usize {
        link.map_or(0, |node_ptr| unsafe { node_ptr.as_ref().len })
    }

    fn leftmost(mut node_ptr: NodePtr) -> NodePtr {
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    fn rightmost(mut node_ptr: NodePtr) -> NodePtr {
        while let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    /// In-order predecessor, walking up through parents when there is no left subtree.
    pub(crate) fn prev(node_ptr: NodePtr) -> Link {
        unsafe {
            if let Some(left_ptr) = node_ptr.as_ref().left {
                return Some(Self::rightmost(left_ptr));
            }
            let mut child_ptr = node_ptr;
            let mut parent = node_ptr.as_ref().parent;
            while let Some(parent_ptr) = parent {
                if parent_ptr.as_ref().right == Some(child_ptr) {
                    return Some(parent_ptr);
                }
                child_ptr = parent_ptr;
                parent = parent_ptr.as_ref().parent;
            }
            None
        }
    }

    /// In-order successor, walking up through parents when there is no right subtree.
    pub(crate) fn next(node_ptr: NodePtr) -> Link {
        unsafe {
            if let Some(right_ptr) = node_ptr.as_ref().right {
                return Some(Self::leftmost(right_ptr));
            }
            let mut child_ptr = node_ptr;
            let mut parent = node_ptr.as_ref().parent;
            while let Some(parent_ptr) = parent {
                if parent_ptr.as_ref().left == Some(child_ptr) {
                    return Some(parent_ptr);
                }
                child_ptr = parent_ptr;
                parent = parent_ptr.as_ref().parent;
            }
            None
        }
    }
}
