//! Persistent (immutable) data structures.
//!
//! This module provides the immutable collections that back reactive state.
//! Every edit produces a new version; parts untouched by the edit are shared
//! between versions instead of being copied:
//!
//! - [`PersistentHashMap`]: Persistent hash map (HAMT), used as a key index
//! - [`PersistentOrderedMap`]: Persistent insertion-ordered map
//! - [`TransientOrderedMap`]: Mutable draft of a [`PersistentOrderedMap`]
//!
//! # Structural Sharing
//!
//! A version is never modified after it has been published. Editing either
//! goes through the persistent API (`insert`, `remove`, ...), which returns a
//! new version, or through a transient draft, which copies shared parts on
//! first write and edits its own parts in place.
//!
//! # Examples
//!
//! ## `PersistentOrderedMap`
//!
//! ```rust
//! use mapstate::persistent::PersistentOrderedMap;
//!
//! let map = PersistentOrderedMap::new()
//!     .insert(3, "c")
//!     .insert(1, "a")
//!     .insert(2, "b");
//!
//! // Entries come back in insertion order
//! let keys: Vec<&i32> = map.keys().collect();
//! assert_eq!(keys, vec![&3, &1, &2]);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert(1, "A");
//! assert_eq!(map.get(&1), Some(&"a"));
//! assert_eq!(updated.get(&1), Some(&"A"));
//! ```
//!
//! ## `TransientOrderedMap`
//!
//! ```rust
//! use mapstate::persistent::PersistentOrderedMap;
//!
//! let base: PersistentOrderedMap<i32, &str> = [(1, "a"), (2, "b")].into_iter().collect();
//!
//! let mut draft = base.transient();
//! draft.insert(3, "c");
//! draft.remove(&1);
//! let next = draft.persistent();
//!
//! assert_eq!(base.len(), 2);
//! assert_eq!(next.iter().collect::<Vec<_>>(), vec![(&2, &"b"), (&3, &"c")]);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod hashmap;
mod ordered_map;

pub use hashmap::PersistentHashMap;
pub use hashmap::PersistentHashMapIterator;
pub use ordered_map::PersistentOrderedMap;
pub use ordered_map::PersistentOrderedMapIntoIterator;
pub use ordered_map::PersistentOrderedMapIterator;
pub use ordered_map::TransientOrderedMap;

// =============================================================================
// Tests
// =============================================================================
