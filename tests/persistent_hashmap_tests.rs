//! Unit tests for PersistentHashMap.
//!
//! PersistentHashMap is the key index behind PersistentOrderedMap; these
//! tests cover it on its own, following a TDD approach.

use mapstate::persistent::PersistentHashMap;
use rstest::rstest;
use std::hash::{Hash, Hasher};

// =============================================================================
// TDD Cycle 1: Empty map creation (new, is_empty, len)
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
}

#[rstest]
fn test_get_on_empty_map_returns_none() {
    let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    assert_eq!(map.get("key"), None);
}

// =============================================================================
// TDD Cycle 2: Basic insert and get operations
// =============================================================================

#[rstest]
fn test_insert_multiple_entries() {
    let map = PersistentHashMap::new()
        .insert("one".to_string(), 1)
        .insert("two".to_string(), 2)
        .insert("three".to_string(), 3);

    assert_eq!(map.len(), 3);
    assert_eq!(map.get("one"), Some(&1));
    assert_eq!(map.get("two"), Some(&2));
    assert_eq!(map.get("three"), Some(&3));
    assert_eq!(map.get("four"), None);
}

#[rstest]
fn test_insert_does_not_modify_original() {
    let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    let map2 = map1.insert("key2".to_string(), 2);

    assert_eq!(map1.len(), 1);
    assert_eq!(map1.get("key2"), None);
    assert_eq!(map2.len(), 2);
    assert_eq!(map2.get("key2"), Some(&2));
}

#[rstest]
fn test_insert_overwrites_existing_key() {
    let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    let map2 = map1.insert("key".to_string(), 2);

    assert_eq!(map1.get("key"), Some(&1));
    assert_eq!(map2.get("key"), Some(&2));
    assert_eq!(map2.len(), 1);
}

// =============================================================================
// TDD Cycle 3: Remove
// =============================================================================

#[rstest]
fn test_remove_existing_key() {
    let map = PersistentHashMap::new()
        .insert(1, "one")
        .insert(2, "two");
    let removed = map.remove(&1);

    assert_eq!(removed.len(), 1);
    assert_eq!(removed.get(&1), None);
    assert_eq!(removed.get(&2), Some(&"two"));
    assert_eq!(map.len(), 2);
}

#[rstest]
fn test_remove_absent_key_keeps_contents() {
    let map = PersistentHashMap::new().insert(1, "one");
    let removed = map.remove(&99);

    assert_eq!(removed, map);
}

#[rstest]
#[case(10)]
#[case(100)]
#[case(1000)]
fn test_insert_then_remove_everything(#[case] count: i32) {
    let full: PersistentHashMap<i32, i32> = (0..count).map(|index| (index, index * 2)).collect();
    assert_eq!(full.len(), count as usize);

    let empty = (0..count).fold(full.clone(), |map, index| map.remove(&index));

    assert!(empty.is_empty());
    assert_eq!(full.get(&(count - 1)), Some(&((count - 1) * 2)));
}

// =============================================================================
// TDD Cycle 4: Hash collisions
// =============================================================================

/// Key whose hash ignores everything but `bucket`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CollidingKey {
    bucket: u8,
    name: &'static str,
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bucket.hash(state);
    }
}

#[rstest]
fn test_colliding_keys_are_kept_apart() {
    let first = CollidingKey { bucket: 0, name: "first" };
    let second = CollidingKey { bucket: 0, name: "second" };

    let map = PersistentHashMap::new()
        .insert(first.clone(), 1)
        .insert(second.clone(), 2);

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&first), Some(&1));
    assert_eq!(map.get(&second), Some(&2));

    let without_first = map.remove(&first);
    assert_eq!(without_first.len(), 1);
    assert_eq!(without_first.get(&first), None);
    assert_eq!(without_first.get(&second), Some(&2));
}

// =============================================================================
// TDD Cycle 5: Iteration and equality
// =============================================================================

#[rstest]
fn test_iter_visits_every_entry_once() {
    let map: PersistentHashMap<i32, i32> = (0..200).map(|index| (index, -index)).collect();

    let mut seen: Vec<(i32, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
    seen.sort_unstable();

    assert_eq!(map.iter().len(), 200);
    assert_eq!(seen, (0..200).map(|index| (index, -index)).collect::<Vec<_>>());
}

#[rstest]
fn test_equality_ignores_insertion_order() {
    let forward: PersistentHashMap<i32, i32> = (0..50).map(|index| (index, index)).collect();
    let backward: PersistentHashMap<i32, i32> = (0..50).rev().map(|index| (index, index)).collect();

    assert_eq!(forward, backward);
    assert_ne!(forward, backward.insert(0, 1));
}
