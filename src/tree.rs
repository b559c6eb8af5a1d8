//! A compressed trie over decimal-digit keys.

use core::fmt;
use core::mem;
use log::{debug, trace};
use crate::error::{Error, Result};
use crate::iter::{Children, Iter};
use crate::node::{copy_label, digit, Arena, Node, NodeId, RADIX};


/// Number of wasted upward steps [`DigitTree::balance`] tolerates by default.
pub const DEFAULT_BALANCE_BUDGET: usize = 5;

/// How far a key could be followed into the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Outcome {
    /// The key ends exactly at a node.
    Found,
    /// The key ends strictly inside the edge leading to a node.
    Substr,
    /// Part of the key could not be matched.
    NotFound,
}

/// The full answer of [`DigitTree::find`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Match {
    pub outcome: Outcome,
    /// The last node the search entered. For `Substr` and mid-edge
    /// `NotFound` this is the node below the point where matching stopped.
    pub node: NodeId,
    /// Number of key bytes consumed; `key[key_offset..]` is the unmatched rest.
    pub key_offset: usize,
    /// Number of label bytes of `node` consumed; the rest of the label
    /// starts at this offset.
    pub edge_offset: usize,
    /// Length of the label of `node`.
    pub edge_len: usize,
}

impl Match {
    /// `true` if matching stopped before the end of `node`'s label.
    pub const fn ends_mid_edge(&self) -> bool {
        self.edge_offset < self.edge_len
    }
}

/// Releases nothing: the payload is simply dropped.
///
/// Handy as the release callback of [`DigitTree::delete_subtree`] when the
/// payloads need no bookkeeping.
pub fn discard<V>(_payload: V) {}

/// Checks that every byte of `key` is a decimal digit.
fn validate(key: &[u8]) -> Result<()> {
    match key.iter().position(|byte| !byte.is_ascii_digit()) {
        Some(position) => Err(Error::InvalidDigit { byte: key[position], position }),
        None => Ok(()),
    }
}

/// A radix tree keyed by strings of decimal digits.
///
/// Each node is addressed by a [`NodeId`] and may carry one payload of type
/// `V`. Edges are labelled with runs of digits, and chains of payload-less
/// single-child nodes are collapsed into one edge.
///
/// The tree hands payloads back to the application instead of dropping them
/// whenever it removes a node: see [`DigitTree::delete_subtree`] and
/// [`DigitTree::take_data`]. Payloads still present when the tree itself is
/// dropped are dropped with it.
pub struct DigitTree<V> {
    pub(crate) nodes: Arena<V>,
    len: usize,
    balance_budget: usize,
}

impl<V> DigitTree<V> {
    /// Creates an empty tree.
    ///
    /// # Panics
    ///
    /// If the root node cannot be allocated. Use [`DigitTree::try_new`] to
    /// observe that as an error.
    pub fn new() -> Self {
        Self::try_new().expect("allocating the root node")
    }

    /// Creates an empty tree, reporting allocation failure.
    pub fn try_new() -> Result<Self> {
        Ok(DigitTree {
            nodes: Arena::with_root()?,
            len: 0,
            balance_budget: DEFAULT_BALANCE_BUDGET,
        })
    }

    /// Sets how many wasted upward steps [`DigitTree::balance`] may take.
    pub fn with_balance_budget(mut self, budget: usize) -> Self {
        self.balance_budget = budget;
        self
    }

    /// The current compaction budget.
    pub const fn balance_budget(&self) -> usize {
        self.balance_budget
    }

    /// Number of nodes carrying a payload.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no node carries a payload.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live nodes, the root included.
    pub const fn node_count(&self) -> usize {
        self.nodes.live()
    }

    /// The root node. It denotes the empty key.
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == NodeId::ROOT
    }

    /// Returns `true` if `id` names a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// The parent of a node; `None` for the root and for stale handles.
    pub fn father(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// The digits on the edge leading into a node. The root's label is empty.
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|node| node.label.as_str())
    }

    /// Children of a node in ascending digit order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children::new(self.nodes.get(id).map(|node| &node.children))
    }

    pub fn data(&self, id: NodeId) -> Option<&V> {
        self.nodes.get(id)?.data.as_ref()
    }

    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut V> {
        self.nodes.get_mut(id)?.data.as_mut()
    }

    /// Attaches a payload to a node.
    ///
    /// The previous payload, if any, is not released by the tree: it is
    /// returned so that the caller can dispose of it.
    pub fn set_data(&mut self, id: NodeId, payload: V) -> Result<Option<V>> {
        let node = self.nodes.get_mut(id).ok_or(Error::StaleNode(id))?;
        let previous = node.data.replace(payload);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Detaches the payload of a node and returns it.
    ///
    /// The node stays in the tree. Call [`DigitTree::balance`] on it
    /// afterwards to give the tree a chance to compact.
    pub fn take_data(&mut self, id: NodeId) -> Option<V> {
        let payload = self.nodes.get_mut(id)?.data.take()?;
        self.len -= 1;
        Some(payload)
    }

    /// An iterator over every node carrying a payload, in lexicographic key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self, NodeId::ROOT, self.len)
    }

    /// Follows `key` from the root as far as the tree allows.
    pub fn find<Q>(&self, key: &Q) -> Result<Match>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let key = key.as_ref();
        validate(key)?;
        Ok(self.locate(key))
    }

    /// Like [`DigitTree::find`], without the offsets.
    pub fn find_lite<Q>(&self, key: &Q) -> Result<(Outcome, NodeId)>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        self.find(key).map(|found| (found.outcome, found.node))
    }

    /// Returns the node denoting exactly `key`, if there is one.
    pub fn get_node<Q>(&self, key: &Q) -> Option<NodeId>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        match self.find_lite(key) {
            Ok((Outcome::Found, id)) => Some(id),
            _ => None,
        }
    }

    /// Finds the deepest node carrying a payload whose key is a prefix of
    /// `key`, along with the length of that prefix.
    pub fn longest_prefix<Q>(&self, key: &Q) -> Result<Option<(NodeId, usize)>>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let key = key.as_ref();
        validate(key)?;

        let mut best = self.nodes[NodeId::ROOT].data.as_ref().map(|_| (NodeId::ROOT, 0));
        let mut id = NodeId::ROOT;
        let mut pos = 0;

        while let Some(&byte) = key.get(pos) {
            let Some(child) = self.nodes[id].child(byte) else {
                break;
            };
            let node = &self.nodes[child];
            if !key[pos..].starts_with(node.label.as_bytes()) {
                break;
            }

            pos += node.label.len();
            id = child;

            if node.data.is_some() {
                best = Some((id, pos));
            }
        }

        Ok(best)
    }

    fn locate(&self, key: &[u8]) -> Match {
        let mut found = Match {
            outcome: Outcome::NotFound,
            node: NodeId::ROOT,
            key_offset: 0,
            edge_offset: 0,
            edge_len: 0,
        };

        while let Some(&byte) = key.get(found.key_offset) {
            let Some(child) = self.nodes[found.node].child(byte) else {
                break;
            };
            let label = self.nodes[child].label.as_bytes();
            let common = label
                .iter()
                .zip(&key[found.key_offset..])
                .take_while(|(a, b)| a == b)
                .count();

            found.node = child;
            found.key_offset += common;
            found.edge_offset = common;
            found.edge_len = label.len();

            if found.ends_mid_edge() {
                break;
            }
        }

        found.outcome = if found.key_offset < key.len() {
            Outcome::NotFound
        } else if found.ends_mid_edge() {
            Outcome::Substr
        } else {
            Outcome::Found
        };

        found
    }

    /// Returns the node denoting `key`, creating it if necessary.
    ///
    /// The returned node carries a payload only if it already existed with
    /// one; attach a payload with [`DigitTree::set_data`].
    pub fn insert<Q>(&mut self, key: &Q) -> Result<NodeId>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let key = key.as_ref();
        validate(key)?;

        let found = self.locate(key);

        match found.outcome {
            Outcome::Found => Ok(found.node),
            Outcome::Substr => self.split(found.node, found.edge_offset),
            Outcome::NotFound if found.ends_mid_edge() => {
                // A lookup after the split would end on the new branch node
                // with no child for the next digit, so the leaf goes right there.
                let suffix = copy_label(&self.nodes[found.node].label.as_bytes()[found.edge_offset..])?;
                let leaf_label = copy_label(&key[found.key_offset..])?;
                self.nodes.reserve(2)?;

                let branch = self.commit_split(found.node, found.edge_offset, suffix);
                Ok(self.attach_leaf(branch, leaf_label))
            }
            Outcome::NotFound => {
                let leaf_label = copy_label(&key[found.key_offset..])?;
                self.nodes.reserve(1)?;
                Ok(self.attach_leaf(found.node, leaf_label))
            }
        }
    }

    /// Cuts the edge into `id` after `at` label bytes and returns the new
    /// branch node that ends at the cut.
    fn split(&mut self, id: NodeId, at: usize) -> Result<NodeId> {
        let suffix = copy_label(&self.nodes[id].label.as_bytes()[at..])?;
        self.nodes.reserve(1)?;
        Ok(self.commit_split(id, at, suffix))
    }

    /// The infallible half of a split: all allocations are already made.
    fn commit_split(&mut self, id: NodeId, at: usize, suffix: String) -> NodeId {
        let node = &mut self.nodes[id];
        debug_assert!(0 < at && at < node.label.len());

        let mut prefix = mem::replace(&mut node.label, suffix);
        prefix.truncate(at);
        let suffix_slot = node.first_digit();
        let parent = node.parent.expect("only the root has no parent, and it is never split");

        let mut branch = Node::with_label(prefix, parent);
        let branch_slot = branch.first_digit();
        branch.children[suffix_slot] = Some(id);

        trace!("split {:?} into {:?} + {:?}", id, branch.label, self.nodes[id].label);

        let branch = self.nodes.insert(branch);
        self.nodes[id].parent = Some(branch);
        self.nodes[parent].children[branch_slot] = Some(branch);

        branch
    }

    /// Hangs a new leaf below `parent`. The slot must be empty.
    fn attach_leaf(&mut self, parent: NodeId, label: String) -> NodeId {
        let leaf = Node::with_label(label, parent);
        let slot = leaf.first_digit();
        debug_assert!(self.nodes[parent].children[slot].is_none());

        trace!("new leaf {:?} below {:?}", leaf.label, parent);

        let leaf = self.nodes.insert(leaf);
        self.nodes[parent].children[slot] = Some(leaf);
        leaf
    }

    /// Unlinks a node from its parent's child slot. No-op for the root.
    fn detach(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        if let Some(parent) = node.parent {
            let slot = node.first_digit();
            debug_assert_eq!(self.nodes[parent].children[slot], Some(id));
            self.nodes[parent].children[slot] = None;
        }
    }

    /// Removes `id` and everything below it.
    ///
    /// Every payload found in the subtree is passed to `release` before its
    /// node is unlinked. The walk keeps its own stack of cursors instead of
    /// recursing, so arbitrarily deep trees are fine. When `id` is the root,
    /// the root itself stays (without payload or children).
    ///
    /// Returns the number of payloads released.
    pub fn delete_subtree<F>(&mut self, id: NodeId, mut release: F) -> Result<usize>
    where
        F: FnMut(V),
    {
        if !self.nodes.contains(id) {
            return Err(Error::StaleNode(id));
        }

        let mut released = 0;
        let mut freed = 0;
        // (node, next child slot to visit)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        stack.try_reserve(1)?;
        stack.push((id, 0));

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            let next = self.nodes[node].children[cursor..]
                .iter()
                .enumerate()
                .find_map(|(offset, child)| child.map(|child| (cursor + offset, child)));

            if let Some((slot, child)) = next {
                top.1 = slot + 1;
                stack.try_reserve(1)?;
                stack.push((child, 0));
                continue;
            }

            // all slots visited: the node is closed
            stack.pop();

            if let Some(payload) = self.nodes[node].data.take() {
                self.len -= 1;
                released += 1;
                release(payload);
            }

            if !self.is_root(node) {
                self.detach(node);
                self.nodes.free(node);
                freed += 1;
            }
        }

        debug!("deleted subtree of {:?}: {} nodes freed, {} payloads released", id, freed, released);

        Ok(released)
    }

    /// Removes every node and payload, leaving an empty tree.
    pub fn clear<F>(&mut self, release: F) -> Result<usize>
    where
        F: FnMut(V),
    {
        self.delete_subtree(NodeId::ROOT, release)
    }

    /// Tears the whole tree down, releasing every payload.
    pub fn delete<F>(mut self, release: F) -> Result<usize>
    where
        F: FnMut(V),
    {
        self.clear(release)
    }

    /// Restores path compression around `id`, typically right after its
    /// payload was taken.
    ///
    /// Walks towards the root, removing payload-less leaves and merging
    /// payload-less single-child nodes into their child. Those steps are
    /// free; any other step spends one unit of the compaction budget, and
    /// the walk ends once the budget is overspent or the root is reached.
    /// A merge that fails to allocate leaves both nodes as they are and
    /// counts as a wasted step.
    pub fn balance(&mut self, id: NodeId) {
        if !self.nodes.contains(id) {
            return;
        }

        let mut pos = id;
        let mut wasted = 0;
        let mut removed = 0;
        let mut merged = 0;

        while wasted <= self.balance_budget {
            let node = &self.nodes[pos];
            let Some(parent) = node.parent else {
                break;
            };

            if node.data.is_none() && node.child_count() == 0 {
                self.detach(pos);
                self.nodes.free(pos);
                removed += 1;
            } else if node.data.is_none() && node.child_count() == 1 {
                match self.merge(pos) {
                    Ok(()) => merged += 1,
                    Err(_) => wasted += 1,
                }
            } else {
                wasted += 1;
            }

            pos = parent;
        }

        debug!(
            "balanced from {:?}: {} removed, {} merged, {} wasted steps",
            id, removed, merged, wasted,
        );
    }

    /// Folds the payload-less single-child node `id` into its child.
    ///
    /// The child keeps its handle, payload and children under the
    /// concatenated label and takes over `id`'s slot.
    fn merge(&mut self, id: NodeId) -> Result<()> {
        let node = &self.nodes[id];
        let child = node.first_child().expect("merged node has exactly one child");
        let parent = node.parent;
        let child_label = &self.nodes[child].label;

        let mut label = String::new();
        label.try_reserve_exact(node.label.len() + child_label.len())?;
        label.push_str(&node.label);
        label.push_str(child_label);

        trace!("merge {:?} + {:?}", node.label, child_label);

        let slot = digit(label.as_bytes()[0]);
        let merged = &mut self.nodes[child];
        merged.label = label;
        merged.parent = parent;

        if let Some(parent) = parent {
            self.nodes[parent].children[slot] = Some(child);
        }
        self.nodes[id].children = [None; RADIX];
        self.nodes.free(id);

        Ok(())
    }

    /// Labels from `id` up to and including the root.
    fn labels_upward(&self, id: NodeId) -> impl Iterator<Item = &str> + '_ {
        core::iter::successors(Some(id), move |&id| self.nodes[id].parent)
            .map(move |id| self.nodes[id].label.as_str())
    }

    /// Rebuilds the key a node denotes by joining the labels on the path
    /// from the root.
    pub fn full_text(&self, id: NodeId) -> Result<String> {
        if !self.nodes.contains(id) {
            return Err(Error::StaleNode(id));
        }

        let len: usize = self.labels_upward(id).map(str::len).sum();

        let mut text = String::new();
        text.try_reserve_exact(len)?;
        text.extend(core::iter::repeat('0').take(len));

        let mut end = len;
        for label in self.labels_upward(id) {
            let start = end - label.len();
            text.replace_range(start..end, label);
            end = start;
        }

        Ok(text)
    }
}

impl<V> Default for DigitTree<V> {
    fn default() -> Self {
        DigitTree::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for DigitTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (id, payload) in self.iter() {
            match self.full_text(id) {
                Ok(key) => map.entry(&key, payload),
                Err(_) => map.entry(&id, payload),
            };
        }
        map.finish()
    }
}

impl<'a, V> IntoIterator for &'a DigitTree<V> {
    type IntoIter = Iter<'a, V>;
    type Item = (NodeId, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
