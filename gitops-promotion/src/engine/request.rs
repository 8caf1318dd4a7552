//! Promotion request parameters.

use crate::manifest::ManifestMutation;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MANIFEST_PATH: &str = "requirements.yaml";
const DEFAULT_BASE_BRANCH: &str = "master";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Everything needed to drive one promotion to a terminal outcome.
#[derive(Debug, Clone)]
pub struct PromotionRequest {
    /// Local checkout of the environment repository, owned exclusively by
    /// the caller for the duration of the promotion.
    pub checkout_path: PathBuf,

    /// Manifest file, relative to the checkout root.
    pub manifest_path: PathBuf,

    /// Branch the pull request targets.
    pub base_branch: String,

    /// Branch the mutation is pushed to.
    pub branch_name: String,

    /// Pull request title; the commit message derives from it.
    pub title: String,

    /// Pull request body.
    pub description: String,

    /// The manifest change being promoted.
    pub mutation: ManifestMutation,

    /// Delay between poll ticks.
    pub poll_interval: Duration,

    /// Wall-clock bound on the whole polling phase.
    pub timeout: Duration,

    /// When false the poller only observes status and never merges.
    pub auto_merge: bool,
}

impl PromotionRequest {
    /// Creates a request with the customary defaults: `requirements.yaml`
    /// at the checkout root, a `master` base branch, a 20 second poll
    /// interval, a one hour timeout and auto-merge enabled.
    #[must_use]
    pub fn new(
        checkout_path: PathBuf,
        branch_name: impl Into<String>,
        title: impl Into<String>,
        mutation: ManifestMutation,
    ) -> Self {
        let title = title.into();
        Self {
            checkout_path,
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            branch_name: branch_name.into(),
            description: title.clone(),
            title,
            mutation,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            auto_merge: true,
        }
    }

    /// Sets the manifest file path relative to the checkout root.
    #[must_use]
    pub fn with_manifest_path(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    /// Sets the branch the pull request targets.
    #[must_use]
    pub fn with_base_branch(mut self, base_branch: impl Into<String>) -> Self {
        self.base_branch = base_branch.into();
        self
    }

    /// Sets the pull request body.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the delay between poll ticks.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the wall-clock bound on the polling phase.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables merge attempts.
    #[must_use]
    pub fn with_auto_merge(mut self, auto_merge: bool) -> Self {
        self.auto_merge = auto_merge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestMutation;

    #[test]
    fn defaults_match_the_promotion_conventions() {
        let request = PromotionRequest::new(
            PathBuf::from("/tmp/env"),
            "promote-app-a",
            "Promote app-a to 1.1.0",
            ManifestMutation::upgrade("app-a", "1.1.0"),
        );

        assert_eq!(request.manifest_path, PathBuf::from("requirements.yaml"));
        assert_eq!(request.base_branch, "master");
        assert_eq!(request.poll_interval, Duration::from_secs(20));
        assert_eq!(request.timeout, Duration::from_secs(3600));
        assert!(request.auto_merge);
        assert_eq!(request.description, request.title);
    }
}
