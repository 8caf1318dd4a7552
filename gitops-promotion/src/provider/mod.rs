//! Git-hosting capability interface and per-backend adapters.
//!
//! The engine is written exclusively against [`GitProvider`]; the adapters
//! map GitHub, GitLab, Gitea and BitBucket APIs onto the same capability set
//! so a promotion behaves identically regardless of where the environment
//! repository is hosted.

mod bitbucket;
mod error;
mod gitea;
mod github;
mod gitlab;
mod handle;
mod kind;
mod resolver;
mod rest;

pub use bitbucket::BitBucketProvider;
pub use error::ProviderError;
pub use gitea::GiteaProvider;
pub use github::GitHubProvider;
pub use gitlab::GitlabProvider;
pub use handle::{CommitStatus, PullRequestHandle};
pub use kind::ProviderKind;
pub use resolver::{CredentialResolver, Credentials, StaticCredentials};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An `owner/name` repository coordinate on a git-hosting server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    pub owner: String,
    pub name: String,
}

impl RepositorySlug {
    /// Creates a repository coordinate.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The capability set the promotion engine needs from a git-hosting backend.
///
/// Implementations are scoped to a single repository and must be safe to
/// call repeatedly; no call carries session state into the next.
#[async_trait]
pub trait GitProvider: Send + Sync {
    /// Opens a pull request from `head` into `base`.
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, ProviderError>;

    /// Re-fetches the merged/closed flags and head commit of a pull request.
    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError>;

    /// Fetches the combined CI status of the last commit on the source branch.
    async fn last_commit_status(
        &self,
        handle: &PullRequestHandle,
    ) -> Result<CommitStatus, ProviderError>;

    /// Merges a pull request. Merging an already-merged request succeeds.
    async fn merge_pull_request(
        &self,
        handle: &PullRequestHandle,
        message: &str,
    ) -> Result<(), ProviderError>;

    /// Adds a comment to a pull request.
    async fn add_comment(
        &self,
        handle: &PullRequestHandle,
        text: &str,
    ) -> Result<(), ProviderError>;

    /// Registers a webhook on the repository for push and pull-request events.
    async fn register_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
    ) -> Result<(), ProviderError>;
}

/// Builds the adapter for a backend kind.
///
/// Credentials come from the resolver; no ambient configuration is read.
pub fn connect(
    kind: ProviderKind,
    server_url: &str,
    repo: RepositorySlug,
    resolver: &dyn CredentialResolver,
) -> Result<Arc<dyn GitProvider>, ProviderError> {
    let credentials = resolver.resolve(server_url)?;
    debug!(kind = kind.as_str(), server = server_url, repo = %repo, "Connecting git provider");

    match kind {
        ProviderKind::GitHub => Ok(Arc::new(GitHubProvider::new(server_url, repo, credentials)?)),
        ProviderKind::Gitlab => Ok(Arc::new(GitlabProvider::new(server_url, repo, credentials)?)),
        ProviderKind::Gitea => Ok(Arc::new(GiteaProvider::new(server_url, repo, credentials)?)),
        ProviderKind::BitBucket => {
            Ok(Arc::new(BitBucketProvider::new(server_url, repo, credentials)?))
        }
    }
}
