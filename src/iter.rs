//! Borrowing in-order iteration.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::tree::{Link, Node};

/// An iterator over the entries of a tree, sorted by key.
///
/// Created by [`BalancedTree::iter`](crate::BalancedTree::iter).
pub struct Iter<'a> {
    next: Link,
    remaining: usize,
    marker: PhantomData<&'a Node>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(first: Link, len: usize) -> Self {
        Self {
            next: first,
            remaining: len,
            marker: PhantomData,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (i32, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;
        let node = unsafe { &*node_ptr.as_ptr() };
        self.next = Node::next(node_ptr);
        self.remaining -= 1;
        Some((node.key, node.value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}
