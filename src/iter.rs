//! Iterators over tree nodes.
//!
//! All of them keep an explicit stack instead of recursing, so they work on
//! trees of any depth.

use core::iter::{Flatten, FusedIterator};
use crate::node::{NodeId, RADIX};
use crate::tree::DigitTree;


/// Children of one node, in ascending digit order.
pub struct Children<'a> {
    iter: Flatten<core::slice::Iter<'a, Option<NodeId>>>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(slots: Option<&'a [Option<NodeId>; RADIX]>) -> Self {
        let slots = slots.map_or(&[][..], |slots| &slots[..]);
        Children { iter: slots.iter().flatten() }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().copied()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().copied()
    }
}

impl FusedIterator for Children<'_> {}

/// Nodes carrying a payload, in lexicographic key order.
pub struct Iter<'a, V> {
    tree: &'a DigitTree<V>,
    stack: Vec<NodeId>,
    len: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(tree: &'a DigitTree<V>, start: NodeId, len: usize) -> Self {
        Iter { tree, stack: vec![start], len }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (NodeId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let id = self.stack.pop()?;
            let node = &tree.nodes[id];

            // pushed in reverse so that the smallest digit is visited first
            self.stack.extend(node.children.iter().rev().flatten().copied());

            if let Some(payload) = node.data.as_ref() {
                self.len -= 1;
                return Some((id, payload));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> ExactSizeIterator for Iter<'_, V> {
    fn len(&self) -> usize {
        self.len
    }
}

/// Keys and payloads, in lexicographic key order.
///
/// Keys are rebuilt incrementally while descending, so each one costs a
/// single copy of the shared path buffer.
pub struct Entries<'a, V> {
    tree: &'a DigitTree<V>,
    /// (node, length of the key up to and excluding the node's label)
    stack: Vec<(NodeId, usize)>,
    key: String,
    len: usize,
}

impl<'a, V> Entries<'a, V> {
    pub(crate) fn new(tree: &'a DigitTree<V>) -> Self {
        Entries {
            tree,
            stack: vec![(tree.root(), 0)],
            key: String::new(),
            len: tree.len(),
        }
    }
}

impl<'a, V> Iterator for Entries<'a, V> {
    type Item = (String, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let (id, depth) = self.stack.pop()?;
            let node = &tree.nodes[id];

            self.key.truncate(depth);
            self.key.push_str(&node.label);

            let depth = self.key.len();
            self.stack.extend(
                node.children
                    .iter()
                    .rev()
                    .flatten()
                    .map(|&child| (child, depth))
            );

            if let Some(payload) = node.data.as_ref() {
                self.len -= 1;
                return Some((self.key.clone(), payload));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<V> FusedIterator for Entries<'_, V> {}

impl<V> ExactSizeIterator for Entries<'_, V> {
    fn len(&self) -> usize {
        self.len
    }
}
