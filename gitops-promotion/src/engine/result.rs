//! Promotion outcome types.

use crate::poller::PollOutcome;
use crate::provider::{CommitStatus, PullRequestHandle};
use crate::publisher::PublishError;
use std::time::Duration;

/// Terminal outcome of one promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// The pull request merged.
    Merged,

    /// The pull request was closed without merging.
    ClosedWithoutMerge,

    /// Polling hit its timeout (or was cancelled).
    TimedOut,

    /// The branch or pull request was never published.
    PublishFailed,
}

impl PromotionOutcome {
    /// Returns the outcome as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::ClosedWithoutMerge => "closed",
            Self::TimedOut => "timed_out",
            Self::PublishFailed => "publish_failed",
        }
    }
}

impl From<PollOutcome> for PromotionOutcome {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Merged => Self::Merged,
            PollOutcome::ClosedWithoutMerge => Self::ClosedWithoutMerge,
            PollOutcome::TimedOut => Self::TimedOut,
        }
    }
}

/// The result of a promotion run.
#[derive(Debug)]
pub struct PromotionResult {
    /// The terminal outcome.
    pub outcome: PromotionOutcome,

    /// The pull request handle at the time of the terminal decision;
    /// absent when publication failed.
    pub handle: Option<PullRequestHandle>,

    /// The publish error when the outcome is [`PromotionOutcome::PublishFailed`].
    pub publish_error: Option<PublishError>,

    /// Last CI status observed during polling, for diagnostics.
    pub last_commit_status: Option<CommitStatus>,

    /// Wall-clock time spent on the promotion.
    pub elapsed: Duration,
}

impl PromotionResult {
    /// Returns true when the promotion landed.
    #[must_use]
    pub fn merged(&self) -> bool {
        self.outcome == PromotionOutcome::Merged
    }

    /// Returns true when publication was skipped because the mutation
    /// changed nothing. Callers usually treat this as success.
    #[must_use]
    pub fn skipped(&self) -> bool {
        matches!(self.publish_error, Some(PublishError::NoChanges { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_outcomes_map_onto_promotion_outcomes() {
        assert_eq!(
            PromotionOutcome::from(PollOutcome::Merged),
            PromotionOutcome::Merged
        );
        assert_eq!(
            PromotionOutcome::from(PollOutcome::ClosedWithoutMerge),
            PromotionOutcome::ClosedWithoutMerge
        );
        assert_eq!(
            PromotionOutcome::from(PollOutcome::TimedOut),
            PromotionOutcome::TimedOut
        );
    }

    #[test]
    fn no_changes_counts_as_a_skip() {
        let result = PromotionResult {
            outcome: PromotionOutcome::PublishFailed,
            handle: None,
            publish_error: Some(PublishError::NoChanges {
                dependency: "app-a".to_string(),
            }),
            last_commit_status: None,
            elapsed: Duration::ZERO,
        };
        assert!(result.skipped());
        assert!(!result.merged());
    }
}
