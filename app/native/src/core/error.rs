//! Unified error types for vbar.
//!
//! Every fallible operation in the crate returns [`Result`]. At the control
//! protocol boundary errors are flattened into a failure response carrying the
//! `Display` text, so the messages here are what CLI users end up reading.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Base error type for all vbar errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IPC communication errors.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Shell command execution errors.
    #[error("Shell error: {0}")]
    Shell(String),

    /// No block is registered under the given name.
    #[error("block '{0}' not found")]
    BlockNotFound(String),

    /// A block with the given name already exists.
    #[error("block '{0}' already exists")]
    DuplicateBlock(String),

    /// Another bar instance owns the control endpoint.
    #[error("vbar is already running on {}", .0.display())]
    AlreadyRunning(PathBuf),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid arguments provided.
    #[error("{0}")]
    InvalidArguments(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self { Self::Config(msg.into()) }

    /// Creates an IPC error.
    pub fn ipc(msg: impl Into<String>) -> Self { Self::Ipc(msg.into()) }

    /// Creates a shell error.
    pub fn shell(msg: impl Into<String>) -> Self { Self::Shell(msg.into()) }

    /// Creates a block-not-found error.
    pub fn not_found(name: impl Into<String>) -> Self { Self::BlockNotFound(name.into()) }

    /// Creates an invalid arguments error.
    pub fn invalid_args(msg: impl Into<String>) -> Self { Self::InvalidArguments(msg.into()) }

    /// Creates a generic error.
    pub fn other(msg: impl Into<String>) -> Self { Self::Other(msg.into()) }

    /// Returns `true` for lookup failures.
    #[must_use]
    pub const fn is_not_found(&self) -> bool { matches!(self, Self::BlockNotFound(_)) }
}

impl From<String> for Error {
    fn from(msg: String) -> Self { Self::Other(msg) }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self { Self::Other(msg.to_string()) }
}
