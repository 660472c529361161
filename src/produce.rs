//! Draft-based production of new versions.
//!
//! A [`Draftable`] value can hand out a mutable draft of itself. An editor
//! edits the draft in place and the draft is then finished into a new
//! version; the base value is never touched:
//!
//! ```text
//!   base ──draft()──► draft ──editor(&mut draft)──► finish(draft) ──► next
//!     │                                                                │
//!     └──────────── shares every part the editor did not touch ────────┘
//! ```
//!
//! The draft is handed to the editor as `&mut`, so it cannot outlive the
//! call that produced it.
//!
//! # Examples
//!
//! ```rust
//! use mapstate::persistent::PersistentOrderedMap;
//! use mapstate::produce::{Draftable, produce, produce_with};
//!
//! let base: PersistentOrderedMap<&str, i32> = [("a", 1)].into_iter().collect();
//!
//! let next = produce(&base, |draft| {
//!     draft.insert("b", 2);
//! });
//! assert_eq!(base.len(), 1);
//! assert_eq!(next.len(), 2);
//!
//! let (same, removed) = produce_with(&next, |draft| draft.remove("missing"));
//! assert_eq!(removed, None);
//! assert!(Draftable::same_version(&next, &same));
//! ```

/// A value that can be edited through a draft to produce a new version.
pub trait Draftable: Clone {
    /// The mutable draft type.
    type Draft;

    /// Starts a draft seeded from `self`.
    fn draft(&self) -> Self::Draft;

    /// Finishes a draft into a new version.
    ///
    /// A draft that saw no edit must finish as the version it was seeded
    /// from, so that [`same_version`](Self::same_version) detects no-ops.
    fn finish(draft: Self::Draft) -> Self;

    /// Returns `true` if both values are the same version.
    fn same_version(left: &Self, right: &Self) -> bool;
}

/// Produces the next version of `base` by running `editor` on a draft.
pub fn produce<T, F>(base: &T, editor: F) -> T
where
    T: Draftable,
    F: FnOnce(&mut T::Draft),
{
    produce_with(base, editor).0
}

/// Like [`produce`], also returning what the editor returned.
pub fn produce_with<T, R, F>(base: &T, editor: F) -> (T, R)
where
    T: Draftable,
    F: FnOnce(&mut T::Draft) -> R,
{
    let mut draft = base.draft();
    let output = editor(&mut draft);
    (T::finish(draft), output)
}

/// Like [`produce`], with an editor that may fail.
///
/// On `Err` the draft is discarded and no version is produced.
///
/// # Errors
///
/// Returns the editor's error unchanged.
///
/// # Examples
///
/// ```rust
/// use mapstate::persistent::PersistentOrderedMap;
/// use mapstate::produce::try_produce;
///
/// let base: PersistentOrderedMap<i32, i32> = PersistentOrderedMap::new();
/// let result = try_produce(&base, |draft| {
///     draft.insert(1, 1);
///     Err("rejected")
/// });
/// assert_eq!(result, Err("rejected"));
/// assert!(base.is_empty());
/// ```
pub fn try_produce<T, E, F>(base: &T, editor: F) -> Result<T, E>
where
    T: Draftable,
    F: FnOnce(&mut T::Draft) -> Result<(), E>,
{
    let mut draft = base.draft();
    editor(&mut draft)?;
    Ok(T::finish(draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::PersistentOrderedMap;
    use rstest::rstest;

    #[rstest]
    fn test_produce_leaves_base_untouched() {
        let base = PersistentOrderedMap::new().insert(1, "a");
        let next = produce(&base, |draft| {
            draft.insert(1, "b");
            draft.insert(2, "c");
        });

        assert_eq!(base.get(&1), Some(&"a"));
        assert_eq!(base.len(), 1);
        assert_eq!(next.get(&1), Some(&"b"));
        assert_eq!(next.len(), 2);
    }

    #[rstest]
    fn test_produce_without_edit_returns_same_version() {
        let base = PersistentOrderedMap::new().insert(1, "a");
        let next = produce(&base, |draft| {
            let _ = draft.get(&1);
        });
        assert!(Draftable::same_version(&base, &next));
    }

    #[rstest]
    fn test_produce_with_returns_editor_output() {
        let base = PersistentOrderedMap::new().insert(1, "a");
        let (next, removed) = produce_with(&base, |draft| draft.remove(&1));
        assert_eq!(removed, Some("a"));
        assert!(next.is_empty());
    }

    #[rstest]
    fn test_try_produce_passes_successful_edit_through() {
        let base: PersistentOrderedMap<i32, i32> = PersistentOrderedMap::new();
        let next = try_produce::<_, (), _>(&base, |draft| {
            draft.insert(1, 1);
            Ok(())
        });
        assert_eq!(next.map(|map| map.len()), Ok(1));
    }
}
