//! Hooks binding draft-based state to a component [`Scope`].
//!
//! Each hook stores its cell in the scope on the first render and hands out
//! a handle to the same cell on every later render.
//!
//! # Examples
//!
//! ```rust
//! use mapstate::hooks::use_map_as_state;
//! use mapstate::persistent::PersistentOrderedMap;
//! use mapstate::runtime::Runtime;
//!
//! let runtime = Runtime::new();
//! let scope = runtime.scope();
//!
//! let component = |scope: &mapstate::runtime::Scope| {
//!     let rows = use_map_as_state(scope, || {
//!         (0..3).map(|id| (id, format!("row {id}"))).collect::<PersistentOrderedMap<_, _>>()
//!     });
//!     rows.size()
//! };
//!
//! assert_eq!(scope.render(component), 3);
//! ```

use std::hash::Hash;

use crate::map_state::MapState;
use crate::persistent::PersistentOrderedMap;
use crate::produce::Draftable;
use crate::runtime::{LocalState, Scope};
use crate::state::ProduceCell;

/// An initial state value, given either ready-made or as a factory.
///
/// A factory is called once, on the first render of the hook.
pub trait InitialValue<T> {
    /// Produces the initial value.
    fn into_initial(self) -> T;
}

impl<T, F> InitialValue<T> for F
where
    F: FnOnce() -> T,
{
    fn into_initial(self) -> T {
        self()
    }
}

impl<K, V> InitialValue<Self> for PersistentOrderedMap<K, V> {
    fn into_initial(self) -> Self {
        self
    }
}

/// Map state handle returned by the map hooks.
pub type UseMapAsState<K, V> = MapState<K, V, LocalState<PersistentOrderedMap<K, V>>>;

/// Draft-based state for any [`Draftable`] value.
///
/// Returns a cell whose `update` returns the produced value synchronously.
pub fn use_produce<T>(scope: &Scope, initial: impl InitialValue<T>) -> ProduceCell<T, LocalState<T>>
where
    T: Draftable + 'static,
{
    scope.use_hook(|| ProduceCell::new(scope.runtime().create_state(initial.into_initial())))
}

/// A map used as state.
///
/// `initial` is either a [`PersistentOrderedMap`] or a closure building one.
pub fn use_map_as_state<K, V>(
    scope: &Scope,
    initial: impl InitialValue<PersistentOrderedMap<K, V>>,
) -> UseMapAsState<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + 'static,
{
    MapState::from_cell(use_produce(scope, initial))
}

/// A map used as state, starting empty.
pub fn use_empty_map_as_state<K, V>(scope: &Scope) -> UseMapAsState<K, V>
where
    K: Clone + Hash + Eq + 'static,
    V: Clone + 'static,
{
    use_map_as_state(scope, PersistentOrderedMap::new)
}
