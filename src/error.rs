//! Error types for the waterlink crate.

use thiserror::Error;

/// Errors surfaced by the persistent-storage bootstrap seam.
///
/// The first two kinds are recoverable by a single erase-and-retry pass;
/// everything else is fatal at startup.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The storage partition has no free pages left.
    #[error("no free pages in storage partition")]
    NoFreePages,

    /// The storage partition was written by a newer layout version.
    #[error("storage partition has a newer layout version")]
    NewVersionFound,

    /// Any other backend failure, carrying the backend's status code.
    #[error("storage backend failure: status {code}")]
    Failed {
        /// Backend-specific status code.
        code: i32,
    },
}

impl StorageError {
    /// Whether a single erase-and-retry pass may clear this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoFreePages | Self::NewVersionFound)
    }
}

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The Bluetooth stack backend is not available or failed to enable.
    #[error("Bluetooth stack not available or disabled")]
    StackUnavailable,

    /// A command issued to the stack backend was rejected.
    #[error("stack command failed: {reason}")]
    CommandFailed {
        /// Description of why the command was rejected.
        reason: String,
    },

    /// Persistent-storage bootstrap failed beyond the erase-and-retry step.
    #[error("storage bootstrap error: {0}")]
    Storage(#[from] StorageError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
