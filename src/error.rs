//! Error types for session-keeper.

use thiserror::Error;

/// Main error type for session-keeper operations.
///
/// Lookup misses and badly encoded identifiers are not errors: the manager
/// treats both as "no session" and starts a fresh one. Only construction-time
/// configuration problems and server I/O surface here.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport mode name that is neither `query` nor `cookie`.
    #[error("unknown transport mode: {0}")]
    InvalidTransportMode(String),

    /// Manager configuration rejected at construction.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for session-keeper operations.
pub type Result<T> = std::result::Result<T, SessionError>;
