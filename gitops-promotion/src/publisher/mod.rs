//! Turning a manifest mutation into an open pull request.
//!
//! The publisher mutates the manifest inside the caller's checkout, commits
//! and pushes the promotion branch through the git seam, then opens the pull
//! request through the provider. The checkout is left mutated; ownership
//! returns to the caller.

mod error;

pub use error::PublishError;

use crate::engine::PromotionRequest;
use crate::git::GitWorkspace;
use crate::manifest;
use crate::provider::{GitProvider, PullRequestHandle};
use std::sync::Arc;
use tracing::{debug, info};

/// Publishes a promotion branch and opens its pull request.
pub struct BranchPublisher {
    provider: Arc<dyn GitProvider>,
    git: Arc<dyn GitWorkspace>,
}

impl BranchPublisher {
    /// Creates a publisher over the given provider and git seams.
    pub fn new(provider: Arc<dyn GitProvider>, git: Arc<dyn GitWorkspace>) -> Self {
        Self { provider, git }
    }

    /// Applies the request's mutation, pushes the branch and opens a pull
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::NoChanges`] when the mutation does not change
    /// the serialized manifest; no branch is pushed and no pull request is
    /// created in that case.
    pub async fn publish(
        &self,
        request: &PromotionRequest,
    ) -> Result<PullRequestHandle, PublishError> {
        let manifest_file = request.checkout_path.join(&request.manifest_path);
        let display_path = manifest_file.display().to_string();

        let original =
            tokio::fs::read_to_string(&manifest_file)
                .await
                .map_err(|source| PublishError::Io {
                    path: display_path.clone(),
                    source,
                })?;

        let mutated = manifest::apply(&original, &request.mutation)?;
        if mutated == original {
            debug!(
                dependency = %request.mutation.dependency_name,
                "Mutation produced no changes"
            );
            return Err(PublishError::NoChanges {
                dependency: request.mutation.dependency_name.clone(),
            });
        }

        tokio::fs::write(&manifest_file, &mutated)
            .await
            .map_err(|source| PublishError::Io {
                path: display_path,
                source,
            })?;

        let message = commit_message(&request.title);
        self.git
            .commit_and_push(&request.checkout_path, &request.branch_name, &message)
            .await?;

        let handle = self
            .provider
            .create_pull_request(
                &request.base_branch,
                &request.branch_name,
                &request.title,
                &request.description,
            )
            .await?;

        info!(
            url = %handle.url,
            branch = %request.branch_name,
            dependency = %request.mutation.dependency_name,
            "Opened promotion pull request"
        );
        Ok(handle)
    }
}

/// Derives the commit message from the pull request title.
fn commit_message(title: &str) -> String {
    format!("chore: {title}")
}
