//! A minimal single-threaded render runtime.
//!
//! The runtime is the host side of [`StateSlot`]: it owns state slots,
//! collects values scheduled by `set`, and makes them render-visible all at
//! once on [`Runtime::commit`]. A [`Scope`] is one component instance; it
//! keeps hook values alive between renders, in call order.
//!
//! ```text
//!   event handler ── set(v1), set(v2) ──► pending ──commit()──► rendered = v2
//!                                           │
//!                                   runtime is dirty
//! ```
//!
//! # Examples
//!
//! ```rust
//! use mapstate::runtime::Runtime;
//! use mapstate::state::StateSlot;
//!
//! let runtime = Runtime::new();
//! let count = runtime.create_state(0);
//!
//! count.set(1);
//! count.set(2);
//! assert_eq!(count.current(), 0);
//! assert!(runtime.is_dirty());
//!
//! assert_eq!(runtime.commit(), 1);
//! assert_eq!(count.current(), 2);
//! assert_eq!(runtime.generation(), 1);
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ScopeError;
use crate::state::StateSlot;

/// A slot with a value waiting to become render-visible.
trait PendingCommit {
    /// Moves the pending value into place. Returns `false` if there was none.
    fn commit(&self) -> bool;
}

#[derive(Default)]
struct RuntimeInner {
    pending: RefCell<Vec<Rc<dyn PendingCommit>>>,
    generation: Cell<u64>,
}

/// Handle to a render runtime. Clones share the same runtime.
#[derive(Clone, Default)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state slot owned by this runtime.
    pub fn create_state<T: Clone + 'static>(&self, initial: T) -> LocalState<T> {
        LocalState {
            cell: Rc::new(SlotCell {
                rendered: RefCell::new(initial),
                pending: RefCell::new(None),
            }),
            runtime: Rc::downgrade(&self.inner),
        }
    }

    /// Creates a component scope rendered by this runtime.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope {
            runtime: self.clone(),
            hooks: RefCell::new(Vec::new()),
            hook_index: Cell::new(0),
            render_count: Cell::new(0),
        }
    }

    /// Returns `true` if some slot has a value waiting for the next commit.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    /// Number of commits that changed at least one slot.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    /// Makes every pending value render-visible.
    ///
    /// Returns the number of slots that changed.
    pub fn commit(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        let committed = pending.iter().filter(|slot| slot.commit()).count();

        if committed > 0 {
            let generation = self.inner.generation.get() + 1;
            self.inner.generation.set(generation);
            tracing::debug!(generation, committed, "runtime committed pending state");
        }
        committed
    }

    fn schedule(&self, slot: Rc<dyn PendingCommit>) {
        self.inner.pending.borrow_mut().push(slot);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Runtime")
            .field("generation", &self.generation())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

struct SlotCell<T> {
    rendered: RefCell<T>,
    pending: RefCell<Option<T>>,
}

impl<T> PendingCommit for SlotCell<T> {
    fn commit(&self) -> bool {
        match self.pending.borrow_mut().take() {
            Some(value) => {
                *self.rendered.borrow_mut() = value;
                true
            }
            None => false,
        }
    }
}

/// A state slot owned by a [`Runtime`].
///
/// `set` stores a pending value that becomes render-visible on the next
/// [`Runtime::commit`]. Setting several times before a commit keeps only the
/// last value. Once the runtime is dropped, `set` applies immediately.
pub struct LocalState<T> {
    cell: Rc<SlotCell<T>>,
    runtime: Weak<RuntimeInner>,
}

impl<T> Clone for LocalState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            runtime: Weak::clone(&self.runtime),
        }
    }
}

impl<T: Clone + 'static> LocalState<T> {
    /// Returns `true` if a value is waiting for the next commit.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.cell.pending.borrow().is_some()
    }
}

impl<T: Clone + 'static> StateSlot<T> for LocalState<T> {
    fn current(&self) -> T {
        self.cell.rendered.borrow().clone()
    }

    fn set(&self, value: T) {
        let Some(inner) = self.runtime.upgrade() else {
            *self.cell.rendered.borrow_mut() = value;
            return;
        };

        let already_scheduled = self.cell.pending.replace(Some(value)).is_some();
        if !already_scheduled {
            Runtime { inner }.schedule(Rc::clone(&self.cell) as Rc<dyn PendingCommit>);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalState<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalState")
            .field("rendered", &*self.cell.rendered.borrow())
            .field("pending", &*self.cell.pending.borrow())
            .finish()
    }
}

/// One component instance.
///
/// Hooks are identified by the order in which they are used during a
/// render, so a component must use the same hooks in the same order on
/// every render.
///
/// # Examples
///
/// ```rust
/// use mapstate::runtime::Runtime;
///
/// let runtime = Runtime::new();
/// let scope = runtime.scope();
///
/// let first = scope.render(|scope| scope.use_hook(|| 41));
/// let second: i32 = scope.render(|scope| scope.use_hook(|| unreachable!()));
/// assert_eq!(first, second);
/// ```
pub struct Scope {
    runtime: Runtime,
    hooks: RefCell<Vec<Box<dyn Any>>>,
    hook_index: Cell<usize>,
    render_count: Cell<usize>,
}

impl Scope {
    /// Returns the runtime rendering this scope.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Runs one render of the component.
    pub fn render<R>(&self, component: impl FnOnce(&Self) -> R) -> R {
        self.hook_index.set(0);
        self.render_count.set(self.render_count.get() + 1);
        component(self)
    }

    /// Number of renders started so far.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.render_count.get()
    }

    /// Stores a value between renders.
    ///
    /// `initializer` runs the first time the hook is reached; later renders
    /// return a clone of the stored value.
    ///
    /// # Panics
    ///
    /// Panics if hooks were used in a different order than on the first
    /// render, or if called from inside another hook's initializer.
    pub fn use_hook<H: Clone + 'static>(&self, initializer: impl FnOnce() -> H) -> H {
        self.try_use_hook(initializer)
            .unwrap_or_else(|error| panic!("{error}"))
    }

    /// Like [`use_hook`](Self::use_hook), reporting rule violations as errors.
    ///
    /// # Errors
    ///
    /// - [`ScopeError::HookListBorrowed`] if called from inside another
    ///   hook's initializer.
    /// - [`ScopeError::HookTypeMismatch`] if the hook at this position was
    ///   initialized with another type.
    pub fn try_use_hook<H: Clone + 'static>(
        &self,
        initializer: impl FnOnce() -> H,
    ) -> Result<H, ScopeError> {
        let index = self.hook_index.get();
        let mut hooks = self
            .hooks
            .try_borrow_mut()
            .map_err(|_| ScopeError::HookListBorrowed)?;

        if index >= hooks.len() {
            hooks.push(Box::new(initializer()));
            tracing::trace!(index, "hook initialized");
        }

        let raw_ref: &dyn Any = hooks[index].as_ref();
        let hook = raw_ref
            .downcast_ref::<H>()
            .cloned()
            .ok_or(ScopeError::HookTypeMismatch {
                index,
                expected: std::any::type_name::<H>(),
            })?;
        self.hook_index.set(index + 1);
        Ok(hook)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Scope")
            .field("hooks", &self.hooks.try_borrow().map(|hooks| hooks.len()).ok())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
