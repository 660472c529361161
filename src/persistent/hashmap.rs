//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations. Inside this crate
//! it serves as the key index of
//! [`PersistentOrderedMap`](super::PersistentOrderedMap).
//!
//! # Overview
//!
//! `PersistentHashMap` is based on Hash Array Mapped Trie (HAMT). It uses a
//! 32-way branching trie where successive 5-bit slices of the key hash
//! select the child at each level.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! # Internal Structure
//!
//! - Branch nodes keep a 32-bit occupancy bitmap and a compressed child array
//! - Leaves store their full hash so splitting never rehashes a key
//! - Keys whose full hashes collide share a collision bucket
//! - Nodes are shared between versions via `ReferenceCounter`

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

use smallvec::{SmallVec, smallvec};

use super::ReferenceCounter;

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash consumed per trie level.
const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting the child index within a node.
const MASK: u64 = (1 << BITS_PER_LEVEL) - 1;

// =============================================================================
// Hash computation
// =============================================================================

/// Computes the hash of a key with the hasher selected by feature flags.
#[cfg(feature = "ahash")]
fn compute_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    use std::hash::BuildHasher;
    use std::sync::OnceLock;

    static STATE: OnceLock<ahash::RandomState> = OnceLock::new();
    BuildHasher::hash_one(STATE.get_or_init(ahash::RandomState::new), key)
}

/// Computes the hash of a key with the hasher selected by feature flags.
#[cfg(all(feature = "fxhash", not(feature = "ahash")))]
fn compute_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    use std::hash::Hasher;

    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Computes the hash of a key with the hasher selected by feature flags.
#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
fn compute_hash<K: Hash + ?Sized>(key: &K) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Extracts the child index at a given depth from a hash.
#[inline]
const fn hash_index(hash: u64, depth: usize) -> usize {
    ((hash >> (depth * BITS_PER_LEVEL)) & MASK) as usize
}

/// Position of `bit` inside a compressed child array.
#[inline]
const fn compressed_position(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Node Definition
// =============================================================================

#[derive(Clone)]
enum Node<K, V> {
    Branch {
        bitmap: u32,
        children: ReferenceCounter<[Child<K, V>]>,
    },
    /// Keys whose full 64-bit hashes are identical.
    Collision {
        hash: u64,
        entries: SmallVec<[(K, V); 2]>,
    },
}

#[derive(Clone)]
enum Child<K, V> {
    Leaf { hash: u64, key: K, value: V },
    Node(ReferenceCounter<Node<K, V>>),
}

impl<K, V> Node<K, V> {
    fn empty_branch() -> Self {
        Self::Branch {
            bitmap: 0,
            children: ReferenceCounter::from(Vec::new()),
        }
    }
}

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// Iteration order is unspecified; use
/// [`PersistentOrderedMap`](super::PersistentOrderedMap) when insertion
/// order matters.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
///
/// # Examples
///
/// ```rust
/// use mapstate::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::new()
///     .insert("one".to_string(), 1)
///     .insert("two".to_string(), 2);
///
/// let updated = map.insert("one".to_string(), 100);
/// assert_eq!(map.get("one"), Some(&1));
/// assert_eq!(updated.get("one"), Some(&100));
/// ```
#[derive(Clone)]
pub struct PersistentHashMap<K, V> {
    root: ReferenceCounter<Node<K, V>>,
    length: usize,
}

impl<K, V> PersistentHashMap<K, V> {
    /// Creates a new empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty_branch()),
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns an iterator over the entries. The order is unspecified.
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V> {
        let mut stack = SmallVec::new();
        if let Node::Branch { children, .. } = self.root.as_ref() {
            stack.push(children.iter());
        }
        PersistentHashMapIterator {
            stack,
            bucket: std::slice::Iter::default(),
            remaining: self.length,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> PersistentHashMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mapstate::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("hello".to_string(), 42);
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = compute_hash(key);
        let mut node = self.root.as_ref();
        let mut depth = 0;

        loop {
            match node {
                Node::Branch { bitmap, children } => {
                    let bit = 1u32 << hash_index(hash, depth);
                    if bitmap & bit == 0 {
                        return None;
                    }
                    match &children[compressed_position(*bitmap, bit)] {
                        Child::Leaf {
                            hash: leaf_hash,
                            key: leaf_key,
                            value,
                        } => {
                            return (*leaf_hash == hash && leaf_key.borrow() == key)
                                .then_some(value);
                        }
                        Child::Node(subnode) => {
                            node = subnode;
                            depth += 1;
                        }
                    }
                }
                Node::Collision {
                    hash: bucket_hash,
                    entries,
                } => {
                    if *bucket_hash != hash {
                        return None;
                    }
                    return entries
                        .iter()
                        .find(|(entry_key, _)| entry_key.borrow() == key)
                        .map(|(_, value)| value);
                }
            }
        }
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair, replacing the value of an existing key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mapstate::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1));
    /// assert_eq!(map2.get("key"), Some(&2));
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = compute_hash(&key);
        let (root, replaced) = Self::insert_into_node(&self.root, hash, key, value, 0);

        Self {
            root: ReferenceCounter::new(root),
            length: if replaced.is_some() {
                self.length
            } else {
                self.length + 1
            },
        }
    }

    /// Returns the rebuilt node and the value that was replaced, if any.
    fn insert_into_node(
        node: &Node<K, V>,
        hash: u64,
        key: K,
        value: V,
        depth: usize,
    ) -> (Node<K, V>, Option<V>) {
        match node {
            Node::Branch { bitmap, children } => {
                let bit = 1u32 << hash_index(hash, depth);
                let position = compressed_position(*bitmap, bit);
                let mut new_children = children.to_vec();

                if bitmap & bit == 0 {
                    new_children.insert(position, Child::Leaf { hash, key, value });
                    return (
                        Node::Branch {
                            bitmap: bitmap | bit,
                            children: ReferenceCounter::from(new_children),
                        },
                        None,
                    );
                }

                let (child, replaced) = match &children[position] {
                    Child::Leaf {
                        hash: leaf_hash,
                        key: leaf_key,
                        value: leaf_value,
                    } => {
                        if *leaf_hash == hash && *leaf_key == key {
                            (
                                Child::Leaf { hash, key, value },
                                Some(leaf_value.clone()),
                            )
                        } else {
                            let merged = Self::merge_leaves(
                                (*leaf_hash, leaf_key.clone(), leaf_value.clone()),
                                (hash, key, value),
                                depth + 1,
                            );
                            (Child::Node(ReferenceCounter::new(merged)), None)
                        }
                    }
                    Child::Node(subnode) => {
                        let (subnode, replaced) =
                            Self::insert_into_node(subnode, hash, key, value, depth + 1);
                        (Child::Node(ReferenceCounter::new(subnode)), replaced)
                    }
                };

                new_children[position] = child;
                (
                    Node::Branch {
                        bitmap: *bitmap,
                        children: ReferenceCounter::from(new_children),
                    },
                    replaced,
                )
            }
            Node::Collision {
                hash: bucket_hash,
                entries,
            } => {
                if *bucket_hash == hash {
                    let mut entries = entries.clone();
                    let replaced = match entries.iter_mut().find(|(entry_key, _)| *entry_key == key)
                    {
                        Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
                        None => {
                            entries.push((key, value));
                            None
                        }
                    };
                    (
                        Node::Collision {
                            hash,
                            entries,
                        },
                        replaced,
                    )
                } else {
                    // Push the bucket one level down so the new hash can branch off.
                    let wrapper = Node::Branch {
                        bitmap: 1u32 << hash_index(*bucket_hash, depth),
                        children: ReferenceCounter::from(vec![Child::Node(
                            ReferenceCounter::new(node.clone()),
                        )]),
                    };
                    Self::insert_into_node(&wrapper, hash, key, value, depth)
                }
            }
        }
    }

    /// Builds the smallest subtree holding two distinct keys.
    fn merge_leaves(
        (first_hash, first_key, first_value): (u64, K, V),
        (second_hash, second_key, second_value): (u64, K, V),
        depth: usize,
    ) -> Node<K, V> {
        if first_hash == second_hash {
            return Node::Collision {
                hash: first_hash,
                entries: smallvec![(first_key, first_value), (second_key, second_value)],
            };
        }

        let first_index = hash_index(first_hash, depth);
        let second_index = hash_index(second_hash, depth);

        if first_index == second_index {
            let subnode = Self::merge_leaves(
                (first_hash, first_key, first_value),
                (second_hash, second_key, second_value),
                depth + 1,
            );
            return Node::Branch {
                bitmap: 1u32 << first_index,
                children: ReferenceCounter::from(vec![Child::Node(ReferenceCounter::new(
                    subnode,
                ))]),
            };
        }

        let first = Child::Leaf {
            hash: first_hash,
            key: first_key,
            value: first_value,
        };
        let second = Child::Leaf {
            hash: second_hash,
            key: second_key,
            value: second_value,
        };
        let children = if first_index < second_index {
            vec![first, second]
        } else {
            vec![second, first]
        };

        Node::Branch {
            bitmap: (1u32 << first_index) | (1u32 << second_index),
            children: ReferenceCounter::from(children),
        }
    }

    /// Removes a key from the map.
    ///
    /// If the key doesn't exist, returns a clone of the original map, which
    /// shares its whole trie with `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mapstate::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(removed.len(), 1);
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = compute_hash(key);
        match Self::remove_from_node(&self.root, hash, key, 0) {
            Some(root) => Self {
                root: ReferenceCounter::new(root.unwrap_or_else(Node::empty_branch)),
                length: self.length - 1,
            },
            None => self.clone(),
        }
    }

    /// Returns `None` when the key is absent, `Some(None)` when the node
    /// became empty, and `Some(Some(node))` otherwise.
    fn remove_from_node<Q>(
        node: &Node<K, V>,
        hash: u64,
        key: &Q,
        depth: usize,
    ) -> Option<Option<Node<K, V>>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match node {
            Node::Branch { bitmap, children } => {
                let bit = 1u32 << hash_index(hash, depth);
                if bitmap & bit == 0 {
                    return None;
                }
                let position = compressed_position(*bitmap, bit);

                let replacement = match &children[position] {
                    Child::Leaf {
                        hash: leaf_hash,
                        key: leaf_key,
                        ..
                    } => {
                        if *leaf_hash != hash || leaf_key.borrow() != key {
                            return None;
                        }
                        None
                    }
                    Child::Node(subnode) => {
                        Self::remove_from_node(subnode, hash, key, depth + 1)?.map(Self::collapse)
                    }
                };

                let mut new_children = children.to_vec();
                let new_bitmap = match replacement {
                    Some(child) => {
                        new_children[position] = child;
                        *bitmap
                    }
                    None => {
                        new_children.remove(position);
                        bitmap & !bit
                    }
                };

                if new_bitmap == 0 {
                    Some(None)
                } else {
                    Some(Some(Node::Branch {
                        bitmap: new_bitmap,
                        children: ReferenceCounter::from(new_children),
                    }))
                }
            }
            Node::Collision {
                hash: bucket_hash,
                entries,
            } => {
                if *bucket_hash != hash {
                    return None;
                }
                let position = entries
                    .iter()
                    .position(|(entry_key, _)| entry_key.borrow() == key)?;
                let mut entries = entries.clone();
                entries.remove(position);

                if entries.is_empty() {
                    Some(None)
                } else {
                    Some(Some(Node::Collision {
                        hash: *bucket_hash,
                        entries,
                    }))
                }
            }
        }
    }

    /// Pulls a lone leaf up into its parent instead of keeping a one-child node.
    fn collapse(node: Node<K, V>) -> Child<K, V> {
        match node {
            Node::Branch { bitmap, children }
                if bitmap.count_ones() == 1 && matches!(children[0], Child::Leaf { .. }) =>
            {
                children[0].clone()
            }
            Node::Collision { hash, mut entries } if entries.len() == 1 => {
                let (key, value) = entries.remove(0);
                Child::Leaf { hash, key, value }
            }
            node => Child::Node(ReferenceCounter::new(node)),
        }
    }

    /// Returns an iterator over the keys. The order is unspecified.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values. The order is unspecified.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// An iterator over the entries of a [`PersistentHashMap`].
pub struct PersistentHashMapIterator<'a, K, V> {
    stack: SmallVec<[std::slice::Iter<'a, Child<K, V>>; 8]>,
    bucket: std::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for PersistentHashMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, value)) = self.bucket.next() {
                self.remaining -= 1;
                return Some((key, value));
            }

            let level = self.stack.last_mut()?;
            match level.next() {
                None => {
                    self.stack.pop();
                }
                Some(Child::Leaf { key, value, .. }) => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Some(Child::Node(node)) => match node.as_ref() {
                    Node::Branch { children, .. } => self.stack.push(children.iter()),
                    Node::Collision { entries, .. } => self.bucket = entries.iter(),
                },
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for PersistentHashMapIterator<'_, K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for PersistentHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for PersistentHashMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, (key, value)| map.insert(key, value))
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentHashMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> PartialEq for PersistentHashMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Clone + Hash + Eq, V: Clone + Eq> Eq for PersistentHashMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentHashMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
