//! Node records and the slot arena that owns them.
//!
//! Every node lives in exactly one arena slot. Children are referenced by
//! handle from the parent's digit-indexed slot array, and each node keeps a
//! non-owning handle to its parent, so the tree needs neither reference
//! counting nor `unsafe`.

use core::ops::{Index, IndexMut};
use crate::error::Result;


/// Branching factor: one child slot per decimal digit.
pub const RADIX: usize = 10;

/// A handle to a node of a [`DigitTree`](crate::DigitTree).
///
/// Handles are cheap to copy and stay valid until the node they name is
/// removed (by subtree deletion or by compaction). A slot that is reused
/// afterwards gets a new generation, so an outdated handle is detected
/// instead of silently naming an unrelated node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// The root occupies the first slot for the whole life of the tree.
    pub(crate) const ROOT: NodeId = NodeId { index: 0, generation: 0 };

    fn slot(self) -> usize {
        self.index as usize
    }
}

/// Maps a key byte to its child slot.
///
/// Keys are validated before they reach the tree, so anything else is a bug.
pub(crate) fn digit(byte: u8) -> usize {
    debug_assert!(byte.is_ascii_digit(), "non-digit byte {byte:#04x} reached the tree");
    usize::from(byte - b'0')
}

/// Copies a validated key fragment into a freshly allocated label.
pub(crate) fn copy_label(fragment: &[u8]) -> Result<String> {
    let mut label = String::new();
    label.try_reserve_exact(fragment.len())?;
    label.extend(fragment.iter().copied().map(char::from));
    Ok(label)
}

#[derive(Debug)]
pub(crate) struct Node<V> {
    /// Digits consumed on the edge from the parent. Empty only for the root.
    pub(crate) label: String,
    pub(crate) data: Option<V>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; RADIX],
}

impl<V> Node<V> {
    pub(crate) const fn root() -> Self {
        Node {
            label: String::new(),
            data: None,
            parent: None,
            children: [None; RADIX],
        }
    }

    pub(crate) fn with_label(label: String, parent: NodeId) -> Self {
        Node {
            label,
            data: None,
            parent: Some(parent),
            children: [None; RADIX],
        }
    }

    /// The slot this node occupies in its parent.
    pub(crate) fn first_digit(&self) -> usize {
        digit(self.label.as_bytes()[0])
    }

    pub(crate) fn child(&self, byte: u8) -> Option<NodeId> {
        self.children[digit(byte)]
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.iter().flatten().count()
    }

    pub(crate) fn first_child(&self) -> Option<NodeId> {
        self.children.iter().flatten().copied().next()
    }
}

#[derive(Debug)]
struct Slot<V> {
    generation: u32,
    node: Option<Node<V>>,
}

/// Slot storage with a free list.
///
/// The free list always has room for every slot, so releasing a node never
/// allocates.
#[derive(Debug)]
pub(crate) struct Arena<V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    live: usize,
}

impl<V> Arena<V> {
    /// Creates an arena holding only the root node.
    pub(crate) fn with_root() -> Result<Self> {
        let mut arena = Arena {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        };
        arena.reserve(1)?;
        let root = arena.insert(Node::root());
        debug_assert_eq!(root, NodeId::ROOT);
        Ok(arena)
    }

    /// Number of live nodes, including the root.
    pub(crate) const fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.slots
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<V>> {
        self.slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Makes sure that the next `count` calls to [`Arena::insert`] succeed
    /// without allocating.
    pub(crate) fn reserve(&mut self, count: usize) -> Result<()> {
        let fresh = count.saturating_sub(self.free.len());
        if fresh > 0 {
            self.slots.try_reserve(fresh)?;
            let wanted = self.slots.len() + fresh;
            self.free.try_reserve(wanted - self.free.len())?;
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, node: Node<V>) -> NodeId {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.node.is_none());
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }

        let index = u32::try_from(self.slots.len()).expect("node arena exceeds u32::MAX slots");
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    /// Releases a node record and its label.
    ///
    /// The payload must already have been handed back to the application.
    pub(crate) fn free(&mut self, id: NodeId) {
        debug_assert_ne!(id, NodeId::ROOT, "the root is never freed");

        let slot = &mut self.slots[id.slot()];
        debug_assert_eq!(slot.generation, id.generation);

        let Some(node) = slot.node.take() else {
            return;
        };
        debug_assert!(node.data.is_none(), "freeing a node that still holds a payload");

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
    }
}

impl<V> Index<NodeId> for Arena<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id).expect("handle of a live node")
    }
}

impl<V> IndexMut<NodeId> for Arena<V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.get_mut(id).expect("handle of a live node")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_recycled_with_a_new_generation() {
        let mut arena = Arena::<u32>::with_root().unwrap();
        assert_eq!(arena.live(), 1);

        arena.reserve(2).unwrap();
        let a = arena.insert(Node::with_label("1".into(), NodeId::ROOT));
        let b = arena.insert(Node::with_label("2".into(), NodeId::ROOT));
        assert_eq!(arena.live(), 3);

        arena.free(a);
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.live(), 2);

        arena.reserve(1).unwrap();
        let c = arena.insert(Node::with_label("3".into(), NodeId::ROOT));
        assert_eq!(c.index, a.index);
        assert_ne!(c, a);
        assert!(arena.get(a).is_none());
        assert_eq!(arena[c].label, "3");
    }

    #[test]
    fn free_list_never_needs_to_grow() {
        let mut arena = Arena::<()>::with_root().unwrap();
        arena.reserve(64).unwrap();

        let ids: Vec<_> = (0..64)
            .map(|i| arena.insert(Node::with_label(i.to_string(), NodeId::ROOT)))
            .collect();

        assert!(arena.free.capacity() >= arena.slots.len());

        for id in ids {
            arena.free(id);
        }
        assert_eq!(arena.live(), 1);
        assert_eq!(arena.free.len(), 64);
    }

    #[test]
    fn node_helpers() {
        let mut node = Node::<()>::with_label("42".into(), NodeId::ROOT);
        assert_eq!(node.first_digit(), 4);
        assert_eq!(node.child_count(), 0);
        assert_eq!(node.first_child(), None);

        let id = NodeId { index: 7, generation: 1 };
        node.children[3] = Some(id);
        assert_eq!(node.child(b'3'), Some(id));
        assert_eq!(node.child(b'4'), None);
        assert_eq!(node.child_count(), 1);
        assert_eq!(node.first_child(), Some(id));
    }

    #[test]
    fn copy_label_keeps_digits() {
        assert_eq!(copy_label(b"0123").unwrap(), "0123");
        assert_eq!(copy_label(b"").unwrap(), "");
    }
}
