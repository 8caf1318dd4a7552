//! The promotion polling state machine.
//!
//! An open pull request is driven to exactly one terminal state: merged,
//! closed without merging, or timed out. Each tick refreshes the pull
//! request, examines CI status and optionally attempts a merge; transient
//! provider failures are logged and absorbed into the next tick so a flaky
//! status endpoint cannot sink a healthy promotion.

use crate::provider::{CommitStatus, GitProvider, ProviderError, PullRequestHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

const DEFAULT_MERGE_MESSAGE: &str = "Automatically merged promotion pull request";

/// Terminal state of a poll run. Terminal states are sinks: once reached,
/// no further transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The pull request merged.
    Merged,

    /// The pull request was closed without merging.
    ClosedWithoutMerge,

    /// The timeout elapsed, or the promotion was cancelled.
    TimedOut,
}

impl PollOutcome {
    /// Returns the outcome as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::ClosedWithoutMerge => "closed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Timing and merge behavior for one poll run.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between poll ticks.
    pub poll_interval: Duration,

    /// Wall-clock bound on the run.
    pub timeout: Duration,

    /// When false, status is observed but merges are never attempted.
    pub auto_merge: bool,

    /// Commit message used for automatic merges.
    pub merge_message: String,
}

impl PollSettings {
    /// Creates settings with the default merge commit message.
    #[must_use]
    pub fn new(poll_interval: Duration, timeout: Duration, auto_merge: bool) -> Self {
        Self {
            poll_interval,
            timeout,
            auto_merge,
            merge_message: DEFAULT_MERGE_MESSAGE.to_string(),
        }
    }

    /// Overrides the merge commit message.
    #[must_use]
    pub fn with_merge_message(mut self, merge_message: impl Into<String>) -> Self {
        self.merge_message = merge_message.into();
        self
    }
}

/// What a poll run observed on its way to a terminal state.
#[derive(Debug)]
pub struct PollReport {
    /// The terminal state reached.
    pub outcome: PollOutcome,

    /// The handle as of the terminal decision.
    pub handle: PullRequestHandle,

    /// Last CI status observed before the terminal decision.
    pub last_commit_status: CommitStatus,

    /// Wall-clock time spent polling.
    pub elapsed: Duration,
}

/// Drives an open pull request to a terminal state.
pub struct PromotionPoller {
    provider: Arc<dyn GitProvider>,
}

impl PromotionPoller {
    /// Creates a poller over the given provider.
    pub fn new(provider: Arc<dyn GitProvider>) -> Self {
        Self { provider }
    }

    /// Polls until the pull request merges, closes, or the timeout elapses.
    ///
    /// A signal on `shutdown` aborts the current or next sleep and reports
    /// [`PollOutcome::TimedOut`] immediately.
    ///
    /// # Errors
    ///
    /// Only fatal provider errors (rejected credentials) abort the run with
    /// an error; transient failures are retried on the next tick.
    pub async fn run(
        &self,
        handle: PullRequestHandle,
        settings: &PollSettings,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<PollReport, ProviderError> {
        let start = Instant::now();
        let mut handle = handle;
        let mut last_commit_status = CommitStatus::Unknown;
        let mut merge_failure_logged = false;

        info!(url = %handle.url, state = "open", "Waiting for pull request to merge");

        loop {
            match self.provider.refresh_status(&mut handle).await {
                Ok(()) => {
                    // Merge is the stronger signal when a provider reports
                    // a pull request as both merged and closed.
                    if handle.is_merged() {
                        info!(url = %handle.url, state = "merged", "Pull request merged");
                        return Ok(PollReport {
                            outcome: PollOutcome::Merged,
                            handle,
                            last_commit_status,
                            elapsed: start.elapsed(),
                        });
                    }
                    if handle.is_closed_without_merge() {
                        warn!(url = %handle.url, state = "closed", "Pull request closed without merging");
                        return Ok(PollReport {
                            outcome: PollOutcome::ClosedWithoutMerge,
                            handle,
                            last_commit_status,
                            elapsed: start.elapsed(),
                        });
                    }

                    match self.provider.last_commit_status(&handle).await {
                        Ok(status) => {
                            last_commit_status = status;
                            match status {
                                CommitStatus::Success if settings.auto_merge => {
                                    if let Err(err) = self
                                        .provider
                                        .merge_pull_request(&handle, &settings.merge_message)
                                        .await
                                    {
                                        if err.is_fatal() {
                                            return Err(err);
                                        }
                                        // Usually eventual-consistency lag in the
                                        // provider's status cache; retried next tick.
                                        if !merge_failure_logged {
                                            merge_failure_logged = true;
                                            warn!(
                                                url = %handle.url,
                                                error = %err,
                                                "Failed to merge pull request; will retry"
                                            );
                                        }
                                    }
                                }
                                CommitStatus::Failure | CommitStatus::Error => {
                                    // A new commit on the branch may recover the
                                    // status, so a red build is not terminal.
                                    warn!(
                                        url = %handle.url,
                                        sha = %handle.head_commit_sha,
                                        status = status.as_str(),
                                        "Last commit status is failing; continuing to poll"
                                    );
                                }
                                _ => {}
                            }
                        }
                        Err(err) => {
                            if err.is_fatal() {
                                return Err(err);
                            }
                            warn!(
                                url = %handle.url,
                                sha = %handle.head_commit_sha,
                                error = %err,
                                "Failed to query last commit status"
                            );
                        }
                    }
                }
                Err(err) => {
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(
                        url = %handle.url,
                        error = %err,
                        "Failed to refresh pull request status; will retry"
                    );
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= settings.timeout {
                warn!(
                    url = %handle.url,
                    state = "timed_out",
                    waited_secs = elapsed.as_secs(),
                    last_commit_status = last_commit_status.as_str(),
                    "Timed out waiting for pull request to merge"
                );
                return Ok(PollReport {
                    outcome: PollOutcome::TimedOut,
                    handle,
                    last_commit_status,
                    elapsed,
                });
            }

            tokio::select! {
                _ = sleep(settings.poll_interval) => {}
                _ = cancelled(&mut shutdown) => {
                    info!(url = %handle.url, state = "timed_out", "Promotion cancelled");
                    return Ok(PollReport {
                        outcome: PollOutcome::TimedOut,
                        handle,
                        last_commit_status,
                        elapsed: start.elapsed(),
                    });
                }
            }
        }
    }
}

/// Resolves when the shutdown signal fires. A dropped sender is treated as
/// "no signal will ever come", not as cancellation.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *shutdown.borrow() {
            return;
        }
    }
}
