//! Relay error type.
//!
//! Every failure of a single request ends up here and is turned into the
//! `error` string of the outbound envelope.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use thiserror::Error;

/// Errors raised while handling one relay request.
#[derive(Error, Debug)]
pub enum RelayError {
    /// `execute`/`query` arrived before a successful `init`.
    #[error("Database not initialized")]
    NotInitialized,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Anything the embedded engine reports (open, prepare, bind, step).
    #[error("{0}")]
    Engine(#[from] rusqlite::Error),
}

impl RelayError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::NotInitialized => "not_initialized",
            RelayError::UnknownMethod(_) => "unknown_method",
            RelayError::MissingArgument(_) => "missing_argument",
            RelayError::InvalidArguments(_) => "invalid_arguments",
            RelayError::Engine(_) => "engine",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
