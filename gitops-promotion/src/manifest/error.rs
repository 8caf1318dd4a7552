//! Manifest error types.

use thiserror::Error;

/// Errors that can occur while mutating a dependency manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {source}")]
    Malformed {
        #[source]
        source: serde_yaml::Error,
    },

    /// The mutated manifest could not be serialized.
    #[error("Failed to serialize manifest: {source}")]
    Serialize {
        #[source]
        source: serde_yaml::Error,
    },

    /// The mutation itself is inconsistent.
    #[error("Invalid mutation for '{name}': {message}")]
    InvalidMutation { name: String, message: String },
}
