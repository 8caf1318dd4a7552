//! Backend kind detection and parsing.

use crate::provider::ProviderError;
use std::fmt;
use std::str::FromStr;

/// The kind of git-hosting backend behind a server URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    Gitlab,
    Gitea,
    BitBucket,
}

impl ProviderKind {
    /// Returns the kind as a string for logging and configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Gitlab => "gitlab",
            Self::Gitea => "gitea",
            Self::BitBucket => "bitbucket",
        }
    }

    /// Guesses the backend kind from a host name.
    ///
    /// Self-hosted servers with neutral host names cannot be detected this
    /// way; callers fall back to explicit configuration for those.
    #[must_use]
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host == "github.com" || host.contains("github") {
            Some(Self::GitHub)
        } else if host.contains("gitlab") {
            Some(Self::Gitlab)
        } else if host.contains("gitea") {
            Some(Self::Gitea)
        } else if host.contains("bitbucket") {
            Some(Self::BitBucket)
        } else {
            None
        }
    }

    /// Guesses the backend kind from a full server URL.
    #[must_use]
    pub fn from_server_url(server_url: &str) -> Option<Self> {
        let parsed = url::Url::parse(server_url).ok()?;
        parsed.host_str().and_then(Self::from_host)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::Gitlab),
            "gitea" => Ok(Self::Gitea),
            "bitbucket" => Ok(Self::BitBucket),
            other => Err(ProviderError::fatal(format!(
                "Unknown git provider kind '{other}'; expected one of github, gitlab, gitea, bitbucket"
            ))),
        }
    }
}
