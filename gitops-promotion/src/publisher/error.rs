//! Branch publication error types.

use crate::git::GitError;
use crate::manifest::ManifestError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Errors that can occur while publishing a promotion branch.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The manifest could not be mutated.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The manifest file could not be read or written.
    #[error("Failed to access manifest '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The commit/push primitive failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Opening the pull request failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The mutation produced no diff; there is nothing to promote. Callers
    /// typically treat this as a skip rather than a failure.
    #[error("Mutation of '{dependency}' produced no manifest changes")]
    NoChanges { dependency: String },
}
