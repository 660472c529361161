//! Error types for state updates and hook scopes.

use thiserror::Error;

/// Represents a state update that did not commit.
///
/// When an update fails, neither the latest nor the rendered value of the
/// cell changes.
///
/// # Examples
///
/// ```rust
/// use mapstate::error::UpdateError;
///
/// let error: UpdateError<&str> = UpdateError::Editor("invalid row");
/// assert_eq!(error.to_string(), "update editor failed: invalid row");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError<E> {
    /// The editor returned an error; its draft was discarded.
    #[error("update editor failed: {0}")]
    Editor(E),
    /// An update was requested from inside an editor of the same cell.
    #[error("update requested while an editor of the same cell is running")]
    Reentrant,
}

/// Represents a violation of the hook rules of a [`Scope`](crate::runtime::Scope).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The hook stored at `index` has a different type than requested.
    #[error(
        "hook #{index} was not initialized as `{expected}`; hooks must be used in the same order on every render"
    )]
    HookTypeMismatch {
        /// Position of the hook in the scope.
        index: usize,
        /// Type name that was requested.
        expected: &'static str,
    },
    /// A hook was used while another hook of the same scope was initializing.
    #[error("the hook list is already borrowed; hooks cannot be used inside a hook initializer")]
    HookListBorrowed,
}
