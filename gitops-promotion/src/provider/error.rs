//! Provider error classification.

use thiserror::Error;

/// Errors returned by git-hosting API calls.
///
/// Every failure is classified as either transient or fatal. Anything the
/// adapters cannot recognize is treated as transient so a flaky status
/// endpoint does not sink an otherwise healthy promotion.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication or authorization was rejected; retrying cannot help.
    #[error("Provider rejected the request: {message}")]
    Fatal { message: String },

    /// A network or API failure that may succeed on a later attempt.
    #[error("Transient provider error: {message}")]
    Transient { message: String },
}

impl ProviderError {
    /// Creates a fatal error.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Creates a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true when the caller must abort instead of retrying.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Classifies an HTTP status code from any backend.
    pub(crate) fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::fatal(message),
            _ => Self::transient(message),
        }
    }
}

impl From<octocrab::Error> for ProviderError {
    fn from(err: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &err {
            return Self::from_status(source.status_code.as_u16(), source.message.clone());
        }
        Self::transient(err.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::transient(err.to_string()),
        }
    }
}
