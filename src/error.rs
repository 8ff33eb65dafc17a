//! The error taxonomy for every recoverable failure the runtime can report.

use thiserror::Error;

/// Errors returned by the public entry points of [`Runtime`](crate::Runtime).
///
/// All variants are recoverable at the caller; none of them poison the
/// runtime or leave it in an inconsistent state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RioError {
    /// The access list referenced a handle that was never registered, or
    /// that has already been unregistered.
    #[error("handle is not registered, or was already unregistered")]
    UnknownHandle,
    /// The same handle appeared twice in one task's access list.
    #[error("a handle may appear at most once in a task's access list")]
    InvalidAccess,
    /// `unregister` was called on a handle that still has outstanding
    /// accesses recorded against it.
    #[error("handle cannot be unregistered while accesses are still outstanding")]
    HandleBusy,
    /// `submit` was called after the runtime began shutting down.
    #[error("runtime has been shut down and no longer accepts submissions")]
    RuntimeShutdown,
}

/// Convenience alias for the runtime's fallible return type.
pub type Result<T> = std::result::Result<T, RioError>;
