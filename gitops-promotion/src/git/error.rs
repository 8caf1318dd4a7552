//! Git working-copy error types.

use thiserror::Error;

/// Errors from the external git primitive.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be executed.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {message}")]
    CommandFailed { command: String, message: String },
}
