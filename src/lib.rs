//! # mapstate
//!
//! A key-value map usable as UI state, updated by editing drafts of
//! immutable versions.
//!
//! ## Overview
//!
//! Reactive UIs re-render when a state value is replaced by a different
//! value. Mutating a map in place is therefore invisible to them, and
//! copying a whole map on every edit is wasteful. This crate provides:
//!
//! - **Persistent maps**: [`PersistentHashMap`](persistent::PersistentHashMap)
//!   and the insertion-ordered
//!   [`PersistentOrderedMap`](persistent::PersistentOrderedMap), whose edits
//!   produce new versions sharing structure with the old ones
//! - **Drafts**: [`produce`](produce::produce) edits a mutable draft of a
//!   version and returns the next version, copying only what was touched
//! - **State cells**: [`ProduceCell`](state::ProduceCell) keeps a latest
//!   value ahead of the rendered one so several updates before a render
//!   compose, and returns each new value synchronously
//! - **Map state**: [`MapState`](map_state::MapState) exposes the familiar
//!   map operations (`set`, `delete`, `clear`, `get`, `has`, `size` and
//!   the iterators) over a cell
//! - **Hooks**: [`use_map_as_state`](hooks::use_map_as_state) binds map
//!   state to a component [`Scope`](runtime::Scope) of the bundled
//!   single-threaded [`Runtime`](runtime::Runtime)
//!
//! ## Feature Flags
//!
//! - `arc`: share versions through `Arc` instead of `Rc`
//! - `serde`: `Serialize`/`Deserialize` for the persistent maps
//! - `fxhash`: hash keys with `rustc-hash`
//! - `ahash`: hash keys with `ahash` (takes precedence over `fxhash`)
//!
//! ## Example
//!
//! ```rust
//! use mapstate::prelude::*;
//!
//! let runtime = Runtime::new();
//! let scope = runtime.scope();
//!
//! let rows = scope.render(|scope| use_empty_map_as_state::<u32, &str>(scope));
//! let next = rows.set(17, "ready");
//! assert!(next.contains_key(&17));
//! assert!(!rows.has(&17));
//!
//! runtime.commit();
//! let rows = scope.render(|scope| use_empty_map_as_state::<u32, &str>(scope));
//! assert!(rows.has(&17));
//! assert_eq!(rows.to_string(), "[Map]");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use mapstate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ScopeError, UpdateError};
    pub use crate::hooks::{
        InitialValue, UseMapAsState, use_empty_map_as_state, use_map_as_state, use_produce,
    };
    pub use crate::map_state::MapState;
    pub use crate::persistent::{PersistentHashMap, PersistentOrderedMap, TransientOrderedMap};
    pub use crate::produce::{Draftable, produce, produce_with, try_produce};
    pub use crate::runtime::{LocalState, Runtime, Scope};
    pub use crate::state::{ProduceCell, StateSlot};
}

pub mod error;
pub mod hooks;
pub mod map_state;
pub mod persistent;
pub mod produce;
pub mod runtime;
pub mod state;
