//! A map from digit strings to arbitrary values, based on a [`DigitTree`].

use core::ops::Index;
use crate::error::Result;
use crate::iter::Entries;
use crate::tree::{DigitTree, Outcome};


/// A map from strings of decimal digits to values, ordered by key.
///
/// Removing entries keeps the underlying tree compressed: every removal is
/// followed by a bounded [`DigitTree::balance`] pass.
#[derive(Debug)]
pub struct DigitMap<V> {
    tree: DigitTree<V>,
}

impl<V> Default for DigitMap<V> {
    fn default() -> Self {
        DigitMap::new()
    }
}

impl<V> DigitMap<V> {
    /// Creates an empty map. The same as `Default`.
    pub fn new() -> Self {
        DigitMap { tree: DigitTree::new() }
    }

    /// Wraps an existing tree, keeping its payloads as the map's values.
    pub fn from_tree(tree: DigitTree<V>) -> Self {
        DigitMap { tree }
    }

    /// The underlying tree.
    pub fn as_tree(&self) -> &DigitTree<V> {
        &self.tree
    }

    pub fn into_tree(self) -> DigitTree<V> {
        self.tree
    }

    /// Returns the number of entries in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if and only if this map contains no entries.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Return a reference to the value, if found.
    ///
    /// Keys containing non-digits are never found.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        self.tree.get_node(key).and_then(|id| self.tree.data(id))
    }

    /// Return a mutable reference to the value, if found.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let id = self.tree.get_node(key)?;
        self.tree.data_mut(id)
    }

    /// Returns `true` if and only if the given key is found in the map.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        self.get(key).is_some()
    }

    /// Inserts a value, returning the one previously stored under `key`.
    pub fn insert<Q>(&mut self, key: &Q, value: V) -> Result<Option<V>>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let id = self.tree.insert(key)?;
        self.tree.set_data(id, value)
    }

    /// Inserts every pair, stopping at the first failure.
    pub fn try_extend<K, I>(&mut self, iter: I) -> Result<()>
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.insert(&key, value)?;
        }
        Ok(())
    }

    /// If the key exists in the map, removes and returns the corresponding value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let id = self.tree.get_node(key)?;
        let value = self.tree.take_data(id)?;
        self.tree.balance(id);
        Some(value)
    }

    /// Removes every entry whose key starts with `prefix`, passing each
    /// value to `release`. Returns the number of entries removed.
    pub fn remove_prefix<Q, F>(&mut self, prefix: &Q, release: F) -> Result<usize>
    where
        Q: ?Sized + AsRef<[u8]>,
        F: FnMut(V),
    {
        let found = self.tree.find(prefix)?;
        if found.outcome == Outcome::NotFound {
            return Ok(0);
        }

        let parent = self.tree.father(found.node);
        let removed = self.tree.delete_subtree(found.node, release)?;
        if let Some(parent) = parent {
            self.tree.balance(parent);
        }

        Ok(removed)
    }

    /// Finds the value stored under the longest key that is a prefix of
    /// `key`, along with the length of that prefix.
    ///
    /// Keys containing non-digits have no prefixes in the map.
    pub fn longest_prefix<Q>(&self, key: &Q) -> Option<(usize, &V)>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let (id, len) = self.tree.longest_prefix(key).ok()??;
        self.tree.data(id).map(|value| (len, value))
    }

    /// Removes all entries, passing each value to `release`.
    pub fn clear<F>(&mut self, release: F) -> Result<usize>
    where
        F: FnMut(V),
    {
        self.tree.clear(release)
    }

    /// An iterator over keys and borrowed values.
    ///
    /// Iteration proceeds in lexicographic order of the keys.
    pub fn iter(&self) -> Entries<'_, V> {
        Entries::new(&self.tree)
    }

    /// An iterator over the keys, in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(key, _value)| key)
    }

    /// An iterator over the borrowed values, in lexicographic key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.tree.iter().map(|(_id, value)| value)
    }
}

impl<V, Q> Index<&Q> for DigitMap<V>
where
    Q: ?Sized + AsRef<[u8]>,
{
    type Output = V;

    fn index(&self, key: &Q) -> &Self::Output {
        self.get(key).expect("key not found in DigitMap")
    }
}

impl<'a, V> IntoIterator for &'a DigitMap<V> {
    type IntoIter = Entries<'a, V>;
    type Item = (String, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
