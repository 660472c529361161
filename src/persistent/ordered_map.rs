//! Persistent insertion-ordered map and its transient draft.
//!
//! This module provides [`PersistentOrderedMap`], the mapping type that
//! reactive state is built on, and [`TransientOrderedMap`], the mutable draft
//! handed to editors while a new version is being produced.
//!
//! # Overview
//!
//! Keys are unique and iterate in the order they were first inserted.
//! Overwriting the value of an existing key keeps its position.
//!
//! # Internal Structure
//!
//! Entries live in an append-only slot log split into chunks of 32 slots.
//! A [`PersistentHashMap`] maps every live key to its slot position:
//!
//! ```text
//!   index: { "b" -> 1, "c" -> 2, "d" -> 32 }
//!
//!   chunks ──► [ chunk 0 ]─► [ _, ("b", ..), ("c", ..), ... ]   (32 slots)
//!              [ chunk 1 ]─► [ ("d", ..) ]
//! ```
//!
//! Removing a key leaves a tombstone (`_`) in its slot. Versions share the
//! index trie and every chunk they did not touch; a draft copies a chunk the
//! first time it writes to it and edits chunks it already owns in place.
//! When tombstones outnumber live entries the log is compacted, keeping order.
//!
//! | Operation      | Complexity                  |
//! |----------------|-----------------------------|
//! | `get`          | O(log32 N)                  |
//! | `insert`       | O(log32 N + N / 32)         |
//! | `remove`       | O(log32 N + N / 32)         |
//! | draft edit     | O(log32 N), amortized       |
//! | `len`          | O(1)                        |
//! | `iter`         | O(N + tombstones)           |

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use super::{PersistentHashMap, ReferenceCounter};
use crate::produce::{Draftable, produce};

// =============================================================================
// Constants
// =============================================================================

const CHUNK_BITS: usize = 5;

/// Number of slots per chunk.
const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

type Slot<K, V> = Option<(K, V)>;

type Chunk<K, V> = Vec<Slot<K, V>>;

/// Splits a slot position into (chunk index, offset within the chunk).
#[inline]
const fn locate(position: usize) -> (usize, usize) {
    (position >> CHUNK_BITS, position & (CHUNK_SIZE - 1))
}

// =============================================================================
// PersistentOrderedMap Definition
// =============================================================================

/// A persistent (immutable) map that remembers insertion order.
///
/// Every edit returns a new version; the receiver stays valid and unchanged.
///
/// # Examples
///
/// ```rust
/// use mapstate::persistent::PersistentOrderedMap;
///
/// let first = PersistentOrderedMap::new().insert(1, "a").insert(2, "b");
/// let second = first.insert(3, "c").remove(&1);
///
/// assert_eq!(first.len(), 2);
/// assert_eq!(second.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
/// ```
#[derive(Clone)]
pub struct PersistentOrderedMap<K, V> {
    index: PersistentHashMap<K, usize>,
    chunks: ReferenceCounter<Vec<ReferenceCounter<Chunk<K, V>>>>,
    /// Number of slots used, live or tombstoned.
    next_position: usize,
}

impl<K, V> PersistentOrderedMap<K, V> {
    /// Creates a new empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: PersistentHashMap::new(),
            chunks: ReferenceCounter::new(Vec::new()),
            next_position: 0,
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns an iterator over the entries in insertion order.
    #[must_use]
    pub fn iter(&self) -> PersistentOrderedMapIterator<'_, K, V> {
        PersistentOrderedMapIterator {
            chunks: &self.chunks,
            front: 0,
            back: self.next_position,
            remaining: self.len(),
        }
    }

    /// Returns an iterator over the keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values in key insertion order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.iter().map(|(_, value)| value)
    }

    /// Returns the oldest entry.
    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    /// Returns the most recently inserted entry.
    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.iter().next_back()
    }

    /// Returns `true` if both maps are the same version, i.e. one was obtained
    /// from the other without any edit.
    ///
    /// Two maps with equal contents built independently are not the same
    /// version; use `==` to compare contents.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.chunks, &other.chunks)
            && self.next_position == other.next_position
    }

    fn slot(&self, position: usize) -> Option<&(K, V)> {
        let (chunk, offset) = locate(position);
        self.chunks.get(chunk)?.get(offset)?.as_ref()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentOrderedMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mapstate::persistent::PersistentOrderedMap;
    ///
    /// let map = PersistentOrderedMap::new().insert("hello".to_string(), 42);
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key)?;
        self.slot(position).map(|(_, value)| value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Returns a new version with `key` associated to `value`.
    ///
    /// A new key goes to the end of the iteration order; an existing key
    /// keeps its position and gets the new value.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut draft = self.transient();
        draft.insert(key, value);
        draft.persistent()
    }

    /// Returns a new version without `key`.
    ///
    /// If the key is absent the result is the same version as `self`.
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut draft = self.transient();
        draft.remove(key);
        draft.persistent()
    }

    /// Returns an empty map.
    ///
    /// Clearing an empty map returns the same version.
    #[must_use]
    pub fn clear(&self) -> Self {
        if self.is_empty() {
            self.clone()
        } else {
            Self::new()
        }
    }

    /// Starts a draft seeded from this version.
    ///
    /// The draft shares every chunk with `self` until it writes to it.
    #[must_use]
    pub fn transient(&self) -> TransientOrderedMap<K, V> {
        TransientOrderedMap {
            index: self.index.clone(),
            chunks: self.chunks.as_ref().clone(),
            next_position: self.next_position,
            base: self.clone(),
            modified: false,
            _marker: PhantomData,
        }
    }

    /// Rebuilds the slot log without tombstones once they dominate.
    fn compacted(self) -> Self {
        let length = self.len();
        let tombstones = self.next_position - length;

        if length == 0 {
            return Self::new();
        }
        if tombstones <= CHUNK_SIZE || tombstones <= length {
            return self;
        }

        let mut draft = Self::new().transient();
        for (key, value) in &self {
            draft.insert(key.clone(), value.clone());
        }
        draft.persistent()
    }
}

// =============================================================================
// TransientOrderedMap Definition
// =============================================================================

/// A mutable draft of a [`PersistentOrderedMap`].
///
/// A draft is created with [`PersistentOrderedMap::transient`], edited in
/// place and turned into a new version with
/// [`persistent`](Self::persistent). The version it was seeded from is never
/// modified. A draft that was not modified finishes as the seed version
/// itself.
///
/// Drafts are `!Send` and `!Sync`: they belong to the single update that
/// created them.
///
/// # Examples
///
/// ```rust
/// use mapstate::persistent::PersistentOrderedMap;
///
/// let base: PersistentOrderedMap<&str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
///
/// let mut draft = base.transient();
/// assert_eq!(draft.insert("a", 10), Some(1));
/// assert_eq!(draft.remove("b"), Some(2));
/// assert_eq!(draft.remove("z"), None);
/// let next = draft.persistent();
///
/// assert_eq!(base.get("a"), Some(&1));
/// assert_eq!(next.get("a"), Some(&10));
/// assert_eq!(next.len(), 1);
/// ```
pub struct TransientOrderedMap<K, V> {
    index: PersistentHashMap<K, usize>,
    chunks: Vec<ReferenceCounter<Chunk<K, V>>>,
    next_position: usize,
    base: PersistentOrderedMap<K, V>,
    modified: bool,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientOrderedMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientOrderedMap<String, String>: Send, Sync);

#[cfg(feature = "arc")]
mod arc_send_sync_verification {
    use super::{PersistentOrderedMap, TransientOrderedMap};

    static_assertions::assert_impl_all!(PersistentOrderedMap<i32, String>: Send, Sync);
    static_assertions::assert_not_impl_any!(TransientOrderedMap<i32, String>: Send, Sync);
}

impl<K, V> TransientOrderedMap<K, V> {
    /// Returns the number of entries in the draft.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the draft contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` once any edit has been applied to the draft.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns an iterator over the draft's entries in insertion order.
    #[must_use]
    pub fn iter(&self) -> PersistentOrderedMapIterator<'_, K, V> {
        PersistentOrderedMapIterator {
            chunks: &self.chunks,
            front: 0,
            back: self.next_position,
            remaining: self.len(),
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientOrderedMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let (chunk, offset) = locate(*self.index.get(key)?);
        self.chunks[chunk][offset].as_ref().map(|(_, value)| value)
    }

    /// Returns `true` if the draft contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Associates `key` with `value`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.modified = true;

        if let Some(&position) = self.index.get(&key) {
            return self
                .slot_mut(position)
                .as_mut()
                .map(|(_, current)| std::mem::replace(current, value));
        }

        let position = self.next_position;
        let (chunk, offset) = locate(position);
        if offset == 0 {
            self.chunks
                .push(ReferenceCounter::new(Vec::with_capacity(CHUNK_SIZE)));
        }
        ReferenceCounter::make_mut(&mut self.chunks[chunk]).push(Some((key.clone(), value)));
        self.index = self.index.insert(key, position);
        self.next_position += 1;
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let position = *self.index.get(key)?;
        self.modified = true;
        self.index = self.index.remove(key);
        self.slot_mut(position).take().map(|(_, value)| value)
    }

    /// Removes every entry. Clearing an empty draft is not an edit.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.modified = true;
        self.index = PersistentHashMap::new();
        self.chunks = Vec::new();
        self.next_position = 0;
    }

    /// Edits the value at `key` through its own draft.
    ///
    /// Returns `false` if the key is absent. The entry is only rewritten when
    /// the nested edit produced a new version of the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mapstate::persistent::PersistentOrderedMap;
    ///
    /// let inner = PersistentOrderedMap::new().insert("count", 1);
    /// let outer = PersistentOrderedMap::new().insert("stats", inner);
    ///
    /// let mut draft = outer.transient();
    /// assert!(draft.produce_at("stats", |stats| {
    ///     stats.insert("count", 2);
    /// }));
    /// let next = draft.persistent();
    ///
    /// assert_eq!(outer.get("stats").and_then(|s| s.get("count")), Some(&1));
    /// assert_eq!(next.get("stats").and_then(|s| s.get("count")), Some(&2));
    /// ```
    pub fn produce_at<Q, F>(&mut self, key: &Q, editor: F) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Draftable,
        F: FnOnce(&mut V::Draft),
    {
        let Some(&position) = self.index.get(key) else {
            return false;
        };
        let (chunk, offset) = locate(position);
        let Some((_, current)) = self.chunks[chunk][offset].as_ref() else {
            return false;
        };

        let next = produce(current, editor);
        if !V::same_version(current, &next) {
            self.modified = true;
            if let Some((_, value)) = self.slot_mut(position).as_mut() {
                *value = next;
            }
        }
        true
    }

    /// Finishes the draft.
    ///
    /// Returns the seed version itself when nothing was edited.
    #[must_use]
    pub fn persistent(self) -> PersistentOrderedMap<K, V> {
        if !self.modified {
            return self.base;
        }
        PersistentOrderedMap {
            index: self.index,
            chunks: ReferenceCounter::new(self.chunks),
            next_position: self.next_position,
        }
        .compacted()
    }

    /// Copy-on-write access to a slot.
    fn slot_mut(&mut self, position: usize) -> &mut Slot<K, V> {
        let (chunk, offset) = locate(position);
        &mut ReferenceCounter::make_mut(&mut self.chunks[chunk])[offset]
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TransientOrderedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Draftable
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone> Draftable for PersistentOrderedMap<K, V> {
    type Draft = TransientOrderedMap<K, V>;

    fn draft(&self) -> Self::Draft {
        self.transient()
    }

    fn finish(draft: Self::Draft) -> Self {
        draft.persistent()
    }

    fn same_version(left: &Self, right: &Self) -> bool {
        left.ptr_eq(right)
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// A borrowing iterator over the entries of an ordered map or draft.
pub struct PersistentOrderedMapIterator<'a, K, V> {
    chunks: &'a [ReferenceCounter<Chunk<K, V>>],
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentOrderedMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            let (chunk, offset) = locate(self.front);
            self.front += 1;
            if let Some((key, value)) = &self.chunks[chunk][offset] {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for PersistentOrderedMapIterator<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            self.back -= 1;
            let (chunk, offset) = locate(self.back);
            if let Some((key, value)) = &self.chunks[chunk][offset] {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
        None
    }
}

impl<K, V> ExactSizeIterator for PersistentOrderedMapIterator<'_, K, V> {}

impl<K, V> std::iter::FusedIterator for PersistentOrderedMapIterator<'_, K, V> {}

/// An owning iterator over the entries of a [`PersistentOrderedMap`].
///
/// It keeps the version it was created from alive, so it is a snapshot:
/// later edits to other versions are never observed.
pub struct PersistentOrderedMapIntoIterator<K, V> {
    map: PersistentOrderedMap<K, V>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<K: Clone, V: Clone> Iterator for PersistentOrderedMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            let position = self.front;
            self.front += 1;
            if let Some(entry) = self.map.slot(position) {
                self.remaining -= 1;
                return Some(entry.clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> DoubleEndedIterator for PersistentOrderedMapIntoIterator<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while self.front < self.back {
            self.back -= 1;
            if let Some(entry) = self.map.slot(self.back) {
                self.remaining -= 1;
                return Some(entry.clone());
            }
        }
        None
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for PersistentOrderedMapIntoIterator<K, V> {}

impl<K: Clone, V: Clone> std::iter::FusedIterator for PersistentOrderedMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentOrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentOrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut draft = Self::new().transient();
        for (key, value) in iter {
            draft.insert(key, value);
        }
        draft.persistent()
    }
}

impl<K: Clone, V: Clone> IntoIterator for PersistentOrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = PersistentOrderedMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentOrderedMapIntoIterator {
            front: 0,
            back: self.next_position,
            remaining: self.len(),
            map: self,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentOrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentOrderedMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Equality is order-sensitive: two maps are equal when they hold the same
/// entries in the same insertion order.
impl<K: PartialEq, V: PartialEq> PartialEq for PersistentOrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for PersistentOrderedMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentOrderedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for PersistentOrderedMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize> serde::Serialize for PersistentOrderedMap<K, V> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentOrderedMapVisitor<K, V> {
    marker: PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for PersistentOrderedMapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = PersistentOrderedMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut draft = PersistentOrderedMap::new().transient();
        while let Some((key, value)) = access.next_entry()? {
            draft.insert(key, value);
        }
        Ok(draft.persistent())
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for PersistentOrderedMap<K, V>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentOrderedMapVisitor {
            marker: PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn numbered(count: usize) -> PersistentOrderedMap<usize, String> {
        (0..count).map(|index| (index, index.to_string())).collect()
    }

    #[rstest]
    #[case(0, (0, 0))]
    #[case(31, (0, 31))]
    #[case(32, (1, 0))]
    #[case(70, (2, 6))]
    fn test_locate_splits_position(#[case] position: usize, #[case] expected: (usize, usize)) {
        assert_eq!(locate(position), expected);
    }

    #[rstest]
    fn test_insert_spills_into_new_chunk() {
        let map = numbered(CHUNK_SIZE + 1);
        assert_eq!(map.chunks.len(), 2);
        assert_eq!(map.get(&CHUNK_SIZE), Some(&CHUNK_SIZE.to_string()));
    }

    #[rstest]
    fn test_edit_shares_untouched_chunks() {
        let base = numbered(CHUNK_SIZE * 3);
        let next = base.insert(0, "zero".to_string());

        assert!(!ReferenceCounter::ptr_eq(&base.chunks[0], &next.chunks[0]));
        assert!(ReferenceCounter::ptr_eq(&base.chunks[1], &next.chunks[1]));
        assert!(ReferenceCounter::ptr_eq(&base.chunks[2], &next.chunks[2]));
    }

    #[rstest]
    fn test_draft_copies_shared_chunk_once() {
        let base = numbered(4);
        let mut draft = base.transient();

        draft.insert(0, "a".to_string());
        let copied = ReferenceCounter::as_ptr(&draft.chunks[0]);
        draft.insert(1, "b".to_string());

        assert_eq!(ReferenceCounter::as_ptr(&draft.chunks[0]), copied);
        assert_eq!(base.get(&0), Some(&"0".to_string()));
    }

    #[rstest]
    fn test_remove_leaves_tombstone_until_compaction() {
        let map = numbered(4).remove(&1);
        assert_eq!(map.next_position, 4);
        assert_eq!(map.len(), 3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[rstest]
    fn test_compaction_keeps_order_and_drops_tombstones() {
        let size = CHUNK_SIZE * 4;
        let mut draft = numbered(size).transient();
        for key in (0..size).filter(|key| key % 8 != 0) {
            draft.remove(&key);
        }
        let map = draft.persistent();

        assert_eq!(map.len(), size / 8);
        assert_eq!(map.next_position, map.len());
        assert_eq!(
            map.keys().copied().collect::<Vec<_>>(),
            (0..size).step_by(8).collect::<Vec<_>>()
        );
    }

    #[rstest]
    fn test_removing_everything_resets_log() {
        let map = numbered(3).remove(&0).remove(&1).remove(&2);
        assert!(map.is_empty());
        assert_eq!(map.next_position, 0);
        assert!(map.chunks.is_empty());
    }

    #[rstest]
    fn test_unmodified_draft_finishes_as_seed_version() {
        let base = numbered(3);
        let mut draft = base.transient();
        assert_eq!(draft.remove(&99), None);
        assert!(!draft.is_modified());
        assert!(draft.persistent().ptr_eq(&base));
    }

    #[rstest]
    fn test_clearing_empty_draft_is_not_an_edit() {
        let base: PersistentOrderedMap<usize, String> = PersistentOrderedMap::new();
        let mut draft = base.transient();
        draft.clear();
        assert!(!draft.is_modified());
        assert!(draft.persistent().ptr_eq(&base));
    }

    #[rstest]
    fn test_iterator_from_both_ends_skips_tombstones() {
        let map = numbered(5).remove(&0).remove(&4);
        let mut iter = map.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next_back().map(|(key, _)| *key), Some(3));
        assert_eq!(iter.next().map(|(key, _)| *key), Some(1));
        assert_eq!(iter.next().map(|(key, _)| *key), Some(2));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[rstest]
    fn test_display_lists_entries_in_order() {
        let map = PersistentOrderedMap::new().insert(2, "b").insert(1, "a");
        assert_eq!(format!("{map}"), "{2: b, 1: a}");
        assert_eq!(format!("{}", PersistentOrderedMap::<i32, i32>::new()), "{}");
    }
}
