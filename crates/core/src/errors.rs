//! # Lanwarden Error Types
//!
//! Errors that abort a run. Collaborator failures (scan, send, reply fetch)
//! never show up here: they are logged at the boundary and the run carries
//! on with an empty result.
//!
//! ## Error Categories
//!
//! - **Storage**: I/O failures while reading or replacing a state file
//! - **State**: persisted state that cannot be decoded
//! - **Configuration**: unreadable or invalid configuration

use std::path::PathBuf;
use thiserror::Error;

/// Error categories, each mapped to its own process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// File system failures (read, write, rename)
    Storage,
    /// Persisted state that cannot be decoded
    State,
    /// Invalid configuration
    Configuration,
}

impl ErrorCategory {
    /// Exit status of the `lanwarden` binary for this category. Failures
    /// that are not a [`WardenError`] exit with 1.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Storage => 2,
            ErrorCategory::State => 3,
            ErrorCategory::Configuration => 4,
        }
    }
}

/// Result type for all fallible core operations.
pub type WardenResult<T> = Result<T, WardenError>;

/// Failures that abort a run before any state is persisted.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Storage I/O failure on one of the state files.
    #[error("I/O error during {operation} on {}: {source}", path.display())]
    Io {
        /// File the operation was acting on
        path: PathBuf,
        /// Short name of the operation (read, write, rename, ...)
        operation: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The ledger file is not a key -> ISO-8601 timestamp mapping.
    #[error("malformed ledger {}: {reason}", path.display())]
    MalformedLedger { path: PathBuf, reason: String },

    /// A registry line that is neither a comment nor `mac,ip,hostname`.
    #[error("malformed registry {} line {line}: {reason}", path.display())]
    MalformedRegistry {
        path: PathBuf,
        /// 1-based line number
        line: usize,
        reason: String,
    },

    /// The poll-cooldown mark does not hold a timestamp.
    #[error("malformed poll mark {}: {reason}", path.display())]
    MalformedPollMark { path: PathBuf, reason: String },

    /// Configuration file unreadable or invalid.
    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl WardenError {
    /// Helper for building an [`WardenError::Io`] from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        WardenError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WardenError::Io { .. } => ErrorCategory::Storage,
            WardenError::MalformedLedger { .. }
            | WardenError::MalformedRegistry { .. }
            | WardenError::MalformedPollMark { .. } => ErrorCategory::State,
            WardenError::Config { .. } => ErrorCategory::Configuration,
        }
    }

    /// Path of the file the error relates to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            WardenError::Io { path, .. }
            | WardenError::MalformedLedger { path, .. }
            | WardenError::MalformedRegistry { path, .. }
            | WardenError::MalformedPollMark { path, .. }
            | WardenError::Config { path, .. } => path,
        }
    }
}
