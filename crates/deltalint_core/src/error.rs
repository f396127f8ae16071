//! Linter error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during a lint run.
///
/// Only fatal conditions live here. Lines the external tool prints that do not
/// parse, tokens that cannot be reconciled to an input file and unknown
/// in-process rule ids are counted in [`BatchStats`](crate::BatchStats) instead.
#[derive(Debug, Error)]
pub enum LinterError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external tool could not be started.
    #[error("Failed to launch '{program}': {message}")]
    ToolLaunch { program: String, message: String },

    /// The external tool did not finish before the batch deadline.
    #[error("'{program}' did not finish within {}s", .timeout.as_secs())]
    ToolTimeout { program: String, timeout: Duration },

    /// Change-set retrieval failed.
    #[error("Git error: {0}")]
    Git(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LinterError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a launch error for `program`.
    pub fn tool_launch(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolLaunch {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Creates a git error.
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git(message.into())
    }
}
