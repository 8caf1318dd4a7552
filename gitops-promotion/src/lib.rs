//! GitOps promotion pull-request engine.
//!
//! Promotes application releases between deployment environments: a version
//! change to an environment repository's dependency manifest is published as
//! a pull request, then polled until it merges, closes, or times out.
//!
//! The engine is backend-agnostic: it talks to GitHub, GitLab, Gitea and
//! BitBucket through one capability interface, [`provider::GitProvider`],
//! and consumes git commit/push as an external primitive through
//! [`git::GitWorkspace`].

pub mod engine;
pub mod git;
pub mod manifest;
pub mod poller;
pub mod provider;
pub mod publisher;

pub use engine::{PromotionEngine, PromotionOutcome, PromotionRequest, PromotionResult};
pub use git::{CommandGit, GitError, GitWorkspace};
pub use manifest::{Dependency, ManifestError, ManifestMutation, MutationOp, Requirements};
pub use poller::{PollOutcome, PollReport, PollSettings, PromotionPoller};
pub use provider::{
    connect, CommitStatus, CredentialResolver, Credentials, GitProvider, ProviderError,
    ProviderKind, PullRequestHandle, RepositorySlug, StaticCredentials,
};
pub use publisher::{BranchPublisher, PublishError};
