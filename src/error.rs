//! # Error Handling
//!
//! Centralized error type for the `repo-mirror` application, built on
//! `thiserror`.
//!
//! Only environment setup failures (a missing configuration document, a
//! provider that cannot be reached during startup, an unknown group
//! selection) abort a run and therefore travel through this enum across
//! component boundaries. Per-repository failures during execution are *data*,
//! not errors: they are captured as [`crate::report::FailureRecord`] entries
//! and surfaced in the final report without interrupting sibling work.
//!
//! Variants carry contextual fields (command line, stderr, path) and, for
//! user-facing setup errors, an optional `hint` describing how to fix the
//! problem.

use thiserror::Error;

/// Main error type for repo-mirror operations
#[derive(Error, Debug)]
pub enum Error {
    /// The grouping configuration document does not exist.
    ///
    /// This is the only failure that makes the process exit non-zero before
    /// any repository work has started.
    #[error("Configuration document not found: {path}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigMissing {
        path: String,
        /// Optional hint for how to create or locate the document
        hint: Option<String>,
    },

    /// A group name given on the command line matched nothing in the catalog.
    #[error("No group matches '{name}'{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GroupNotFound {
        name: String,
        /// Optional hint listing the known group names
        hint: Option<String>,
    },

    /// A source control provider command could not be executed or returned
    /// an unexpected failure.
    #[error("Provider command failed: {command} - {message}")]
    Provider { command: String, message: String },

    /// A git command exited unsuccessfully.
    #[error("Git command failed in {dir}: {command} - {stderr}")]
    Git {
        command: String,
        dir: String,
        stderr: String,
    },

    /// The bounded worker pool for a wave could not be constructed.
    #[error("Worker pool setup failed: {message}")]
    WorkerPool { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Provider output that could not be decoded as JSON.
    #[error("Provider output parsing error: {0}")]
    ProviderOutput(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
