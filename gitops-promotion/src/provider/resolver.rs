//! Credential resolution for git-hosting backends.
//!
//! Credentials are passed explicitly into the adapter factory; the engine
//! never reads ambient or process-wide auth configuration.

use crate::provider::ProviderError;
use std::fmt;

/// Credentials for a git-hosting server.
#[derive(Clone)]
pub struct Credentials {
    /// Username, used by backends that authenticate with basic auth.
    pub username: String,

    /// API token or app password.
    pub token: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials for a given git-hosting server.
pub trait CredentialResolver: Send + Sync {
    /// Resolves credentials for the server at `server_url`.
    fn resolve(&self, server_url: &str) -> Result<Credentials, ProviderError>;
}

/// A resolver that always returns one fixed credential pair.
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    /// Wraps a fixed credential pair.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, _server_url: &str) -> Result<Credentials, ProviderError> {
        Ok(self.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_returns_its_pair() {
        let resolver = StaticCredentials::new(Credentials::new("bot", "secret"));
        let credentials = resolver.resolve("https://github.com").unwrap();
        assert_eq!(credentials.username, "bot");
        assert_eq!(credentials.token, "secret");
    }

    #[test]
    fn debug_redacts_the_token() {
        let rendered = format!("{:?}", Credentials::new("bot", "secret"));
        assert!(!rendered.contains("secret"));
    }
}
