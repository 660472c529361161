//! A key-value map used as reactive state.
//!
//! [`MapState`] looks like an ordinary map, but every edit produces a new
//! [`PersistentOrderedMap`] version through a [`ProduceCell`]:
//!
//! - `set`, `delete` and `clear` draft from the latest version, schedule a
//!   re-render, and return synchronously;
//! - `get`, `has`, `size` and the iterators read the render-visible version.
//!
//! Because `set` returns the complete new version, a caller can read values
//! it just wrote before any re-render happens:
//!
//! ```rust
//! use mapstate::hooks::use_empty_map_as_state;
//! use mapstate::runtime::Runtime;
//!
//! let runtime = Runtime::new();
//! let scope = runtime.scope();
//! let rows = scope.render(|scope| use_empty_map_as_state::<u32, String>(scope));
//!
//! let next = rows.set(1, "draft".to_string());
//! assert_eq!(next.get(&1).map(String::as_str), Some("draft"));
//! assert!(!rows.has(&1)); // not rendered yet
//!
//! runtime.commit();
//! assert_eq!(rows.get(&1).as_deref(), Some("draft"));
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use crate::persistent::{
    PersistentOrderedMap, PersistentOrderedMapIntoIterator, TransientOrderedMap,
};
use crate::state::{ProduceCell, StateSlot};

/// Tag reported by [`MapState::to_string_tag`] and its `Display` output.
const TO_STRING_TAG: &str = "Map";

/// A map-shaped handle over reactive state.
///
/// Cloning a `MapState` gives another handle to the same state.
pub struct MapState<K, V, S> {
    cell: ProduceCell<PersistentOrderedMap<K, V>, S>,
}

impl<K, V, S> MapState<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone,
    S: StateSlot<PersistentOrderedMap<K, V>>,
{
    /// Creates a map state over `slot`.
    pub fn new(slot: S) -> Self {
        Self::from_cell(ProduceCell::new(slot))
    }

    /// Wraps an existing cell.
    pub const fn from_cell(cell: ProduceCell<PersistentOrderedMap<K, V>, S>) -> Self {
        Self { cell }
    }

    /// Associates `key` with `value` and returns the whole new map.
    ///
    /// A new key is appended to the iteration order; an existing key keeps
    /// its position. Setting a key always counts as an edit, even when the
    /// value is equal to the current one.
    pub fn set(&self, key: K, value: V) -> PersistentOrderedMap<K, V> {
        self.cell.update(|draft| {
            draft.insert(key, value);
        })
    }

    /// Removes `key`. Returns `true` if it was present.
    ///
    /// Deleting an absent key changes nothing and requests no render.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.cell
            .update_with(|draft| draft.remove(key).is_some())
            .1
    }

    /// Removes every entry.
    ///
    /// Clearing an already empty map changes nothing and requests no render.
    pub fn clear(&self) {
        self.cell.update(TransientOrderedMap::clear);
    }

    /// Applies several edits as a single update and returns the new map.
    pub fn update<F>(&self, editor: F) -> PersistentOrderedMap<K, V>
    where
        F: FnOnce(&mut TransientOrderedMap<K, V>),
    {
        self.cell.update(editor)
    }

    /// Like [`update`](Self::update), also returning what the editor returned.
    pub fn update_with<R, F>(&self, editor: F) -> (PersistentOrderedMap<K, V>, R)
    where
        F: FnOnce(&mut TransientOrderedMap<K, V>) -> R,
    {
        self.cell.update_with(editor)
    }

    /// Returns the render-visible value of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.snapshot().get(key).cloned()
    }

    /// Returns `true` if the render-visible map contains `key`.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.snapshot().contains_key(key)
    }

    /// Number of entries in the render-visible map.
    pub fn size(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if the render-visible map is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Iterates over the keys of the render-visible map, in insertion order.
    ///
    /// The iterator holds its own snapshot; edits made while iterating are
    /// not observed.
    pub fn keys(&self) -> Keys<K, V> {
        Keys(self.entries())
    }

    /// Iterates over the values of the render-visible map, in key insertion
    /// order.
    pub fn values(&self) -> Values<K, V> {
        Values(self.entries())
    }

    /// Iterates over the entries of the render-visible map, in insertion
    /// order.
    pub fn entries(&self) -> Entries<K, V> {
        Entries(self.snapshot().into_iter())
    }

    /// Calls `callback` with `(value, key, map)` for every entry of the
    /// render-visible map, in insertion order.
    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(&V, &K, &PersistentOrderedMap<K, V>),
    {
        let snapshot = self.snapshot();
        for (key, value) in &snapshot {
            callback(value, key, &snapshot);
        }
    }

    /// Returns the render-visible map.
    pub fn snapshot(&self) -> PersistentOrderedMap<K, V> {
        self.cell.rendered()
    }

    /// Returns the most recently produced map, which may not be rendered yet.
    pub fn latest(&self) -> PersistentOrderedMap<K, V> {
        self.cell.latest()
    }

    /// Returns the tag identifying this value as a map.
    pub const fn to_string_tag(&self) -> &'static str {
        TO_STRING_TAG
    }
}

impl<K, V, S: Clone> Clone for MapState<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

/// Writes the tag only, never the contents.
impl<K, V, S> fmt::Display for MapState<K, V, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{TO_STRING_TAG}]")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for MapState<K, V, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MapState")
            .field("cell", &self.cell)
            .finish()
    }
}

impl<K, V, S> IntoIterator for &MapState<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone,
    S: StateSlot<PersistentOrderedMap<K, V>>,
{
    type Item = (K, V);
    type IntoIter = Entries<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Entries of a [`MapState`] snapshot, in insertion order.
pub struct Entries<K, V>(PersistentOrderedMapIntoIterator<K, V>);

/// Keys of a [`MapState`] snapshot, in insertion order.
pub struct Keys<K, V>(Entries<K, V>);

/// Values of a [`MapState`] snapshot, in key insertion order.
pub struct Values<K, V>(Entries<K, V>);

impl<K: Clone, V: Clone> Iterator for Entries<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K: Clone, V: Clone> Iterator for Keys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K: Clone, V: Clone> Iterator for Values<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for Entries<K, V> {}
impl<K: Clone, V: Clone> ExactSizeIterator for Keys<K, V> {}
impl<K: Clone, V: Clone> ExactSizeIterator for Values<K, V> {}

impl<K: Clone, V: Clone> std::iter::FusedIterator for Entries<K, V> {}
impl<K: Clone, V: Clone> std::iter::FusedIterator for Keys<K, V> {}
impl<K: Clone, V: Clone> std::iter::FusedIterator for Values<K, V> {}
