//! Promotion orchestration.
//!
//! [`PromotionEngine`] runs publication then polling and folds both into a
//! single [`PromotionResult`]. It never rolls anything back: a published
//! but unmerged pull request is left in place for manual follow-up.

mod request;
mod result;

pub use request::PromotionRequest;
pub use result::{PromotionOutcome, PromotionResult};

use crate::git::GitWorkspace;
use crate::poller::{PollSettings, PromotionPoller};
use crate::provider::{GitProvider, ProviderError};
use crate::publisher::{BranchPublisher, PublishError};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info};

/// The sole public entry point: drives one promotion from manifest mutation
/// to a terminal pull-request outcome.
pub struct PromotionEngine {
    publisher: BranchPublisher,
    poller: PromotionPoller,
}

impl PromotionEngine {
    /// Creates an engine over a provider and a git primitive.
    pub fn new(provider: Arc<dyn GitProvider>, git: Arc<dyn GitWorkspace>) -> Self {
        Self {
            publisher: BranchPublisher::new(provider.clone(), git),
            poller: PromotionPoller::new(provider),
        }
    }

    /// Runs a promotion to completion.
    ///
    /// # Errors
    ///
    /// Only fatal provider errors during polling surface as `Err`; every
    /// other path, including publish failures, yields a [`PromotionResult`].
    pub async fn promote(
        &self,
        request: &PromotionRequest,
    ) -> Result<PromotionResult, ProviderError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let result = self.promote_with_shutdown(request, shutdown_rx).await;
        drop(shutdown_tx);
        result
    }

    /// Runs a promotion that can be cancelled through `shutdown`.
    ///
    /// Cancellation is observed at the next suspension point and reported
    /// as [`PromotionOutcome::TimedOut`], indistinguishable from a natural
    /// timeout.
    pub async fn promote_with_shutdown(
        &self,
        request: &PromotionRequest,
        shutdown: watch::Receiver<bool>,
    ) -> Result<PromotionResult, ProviderError> {
        let start = Instant::now();
        info!(
            dependency = %request.mutation.dependency_name,
            operation = request.mutation.operation.as_str(),
            branch = %request.branch_name,
            "Starting promotion"
        );

        let handle = match self.publisher.publish(request).await {
            Ok(handle) => handle,
            Err(err) => {
                match &err {
                    PublishError::NoChanges { dependency } => {
                        info!(dependency = %dependency, "Nothing to promote");
                    }
                    other => {
                        error!(error = %other, "Failed to publish promotion branch");
                    }
                }
                return Ok(PromotionResult {
                    outcome: PromotionOutcome::PublishFailed,
                    handle: None,
                    publish_error: Some(err),
                    last_commit_status: None,
                    elapsed: start.elapsed(),
                });
            }
        };

        let settings = PollSettings::new(request.poll_interval, request.timeout, request.auto_merge);
        let report = self.poller.run(handle, &settings, shutdown).await?;

        let outcome = PromotionOutcome::from(report.outcome);
        info!(
            url = %report.handle.url,
            outcome = outcome.as_str(),
            elapsed_secs = report.elapsed.as_secs(),
            "Promotion finished"
        );
        Ok(PromotionResult {
            outcome,
            handle: Some(report.handle),
            publish_error: None,
            last_commit_status: Some(report.last_commit_status),
            elapsed: start.elapsed(),
        })
    }
}
