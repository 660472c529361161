//! State cells that produce their next value from a draft.
//!
//! A UI runtime provides a "value + setter" primitive: reading gives the
//! value of the last committed render and setting schedules a re-render with
//! a new value. [`StateSlot`] is that primitive as a trait, and
//! [`ProduceCell`] builds draft-based updates on top of it.
//!
//! # Rendered and latest values
//!
//! A cell tracks two values:
//!
//! - the **rendered** value, owned by the slot, which only changes when the
//!   runtime commits a render;
//! - the **latest** value, owned by the cell, which is the result of the most
//!   recent update and may be ahead of the rendered value.
//!
//! Every update drafts from the latest value, so several updates issued
//! before the next render compose instead of overwriting each other:
//!
//! ```text
//!   update #1: latest v0 ──► v1   set(v1)
//!   update #2: latest v1 ──► v2   set(v2)
//!   commit:    rendered v0 ──► v2
//! ```

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use crate::error::UpdateError;
use crate::produce::Draftable;

/// A host-provided state primitive.
///
/// `current` returns the value bound to the last committed render. `set`
/// requests a re-render with a new value; when that render happens is up to
/// the host.
pub trait StateSlot<T> {
    /// Returns the render-visible value.
    fn current(&self) -> T;

    /// Schedules `value` as the next render-visible value.
    fn set(&self, value: T);
}

/// A state cell whose updates edit a draft of the latest value.
///
/// Cloning a `ProduceCell` gives another handle to the same cell.
///
/// # Examples
///
/// ```rust
/// use mapstate::persistent::PersistentOrderedMap;
/// use mapstate::runtime::Runtime;
/// use mapstate::state::ProduceCell;
///
/// let runtime = Runtime::new();
/// let cell = ProduceCell::new(runtime.create_state(PersistentOrderedMap::new()));
///
/// let first = cell.update(|draft| {
///     draft.insert("a", 1);
/// });
/// let second = cell.update(|draft| {
///     draft.insert("b", 2);
/// });
///
/// // Both updates are visible in the value returned by the second one...
/// assert_eq!(first.len(), 1);
/// assert_eq!(second.len(), 2);
/// // ...while the rendered value waits for the runtime to commit.
/// assert!(cell.rendered().is_empty());
/// runtime.commit();
/// assert_eq!(cell.rendered().len(), 2);
/// ```
pub struct ProduceCell<T, S> {
    slot: S,
    latest: Rc<RefCell<T>>,
    updating: Rc<Cell<bool>>,
}

/// Clears the in-update flag when the update ends, including by unwinding.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T, S> ProduceCell<T, S>
where
    T: Draftable,
    S: StateSlot<T>,
{
    /// Creates a cell whose latest value starts at the slot's current value.
    pub fn new(slot: S) -> Self {
        let initial = slot.current();
        Self {
            slot,
            latest: Rc::new(RefCell::new(initial)),
            updating: Rc::new(Cell::new(false)),
        }
    }

    /// Returns the render-visible value.
    pub fn rendered(&self) -> T {
        self.slot.current()
    }

    /// Returns the most recently produced value.
    pub fn latest(&self) -> T {
        self.latest.borrow().clone()
    }

    /// Applies `editor` to a draft of the latest value and returns the new
    /// value.
    ///
    /// The new value becomes the latest value immediately and is scheduled
    /// as the next rendered value. An editor that changes nothing returns the
    /// latest value itself and schedules nothing.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an editor of the same cell. A panicking
    /// editor propagates its panic and commits nothing.
    pub fn update<F>(&self, editor: F) -> T
    where
        F: FnOnce(&mut T::Draft),
    {
        self.update_with(editor).0
    }

    /// Like [`update`](Self::update), also returning what the editor returned.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an editor of the same cell.
    pub fn update_with<R, F>(&self, editor: F) -> (T, R)
    where
        F: FnOnce(&mut T::Draft) -> R,
    {
        match self.try_update_with(|draft| Ok::<R, Infallible>(editor(draft))) {
            Ok(produced) => produced,
            Err(UpdateError::Editor(never)) => match never {},
            Err(error @ UpdateError::Reentrant) => panic!("{error}"),
        }
    }

    /// Like [`update`](Self::update), with an editor that may fail.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Editor`] if the editor failed; nothing is committed.
    /// - [`UpdateError::Reentrant`] if called from inside an editor of the
    ///   same cell; nothing is committed.
    pub fn try_update<E, F>(&self, editor: F) -> Result<T, UpdateError<E>>
    where
        F: FnOnce(&mut T::Draft) -> Result<(), E>,
    {
        self.try_update_with(editor).map(|(value, ())| value)
    }

    /// Like [`try_update`](Self::try_update), also returning what the editor
    /// returned on success.
    ///
    /// # Errors
    ///
    /// Same as [`try_update`](Self::try_update).
    pub fn try_update_with<R, E, F>(&self, editor: F) -> Result<(T, R), UpdateError<E>>
    where
        F: FnOnce(&mut T::Draft) -> Result<R, E>,
    {
        if self.updating.replace(true) {
            return Err(UpdateError::Reentrant);
        }
        let _guard = UpdateGuard(&self.updating);

        let base = self.latest();
        let mut draft = base.draft();
        let output = editor(&mut draft).map_err(UpdateError::Editor)?;
        let next = T::finish(draft);

        if T::same_version(&base, &next) {
            tracing::trace!("update produced no change; render not requested");
            return Ok((next, output));
        }

        *self.latest.borrow_mut() = next.clone();
        self.slot.set(next.clone());
        tracing::trace!("update committed; render requested");
        Ok((next, output))
    }
}

impl<T, S: Clone> Clone for ProduceCell<T, S> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            latest: Rc::clone(&self.latest),
            updating: Rc::clone(&self.updating),
        }
    }
}

impl<T: fmt::Debug, S> fmt::Debug for ProduceCell<T, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProduceCell")
            .field("latest", &*self.latest.borrow())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(
    ProduceCell<crate::persistent::PersistentOrderedMap<i32, i32>, ()>: Send, Sync
);
