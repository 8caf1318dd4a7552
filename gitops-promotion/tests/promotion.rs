//! End-to-end promotion scenarios against scripted provider and git seams.

use async_trait::async_trait;
use gitops_promotion::{
    CommitStatus, GitError, GitProvider, GitWorkspace, ManifestMutation, PromotionEngine,
    PromotionOutcome, PromotionRequest, ProviderError, PublishError, PullRequestHandle,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

const MANIFEST: &str = "dependencies:
- name: app-a
  version: 1.0.0
- name: app-b
  version: 2.3.1
";

const PR_URL: &str = "https://git.example.com/env/staging/pull/1";

/// One scripted answer to a `refresh_status` call.
enum Refresh {
    State { merged: bool, closed: bool },
    Fail(ProviderError),
}

/// A provider whose responses are scripted per call.
///
/// When the refresh script runs out, the pull request reports open until a
/// successful merge call, after which it reports merged. When the status
/// script runs out, `default_status` repeats forever.
struct ScriptedProvider {
    refreshes: Mutex<VecDeque<Refresh>>,
    statuses: Mutex<VecDeque<CommitStatus>>,
    default_status: CommitStatus,
    create_fails: bool,
    merge_fails: bool,
    merged: AtomicBool,
    create_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    merge_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(default_status: CommitStatus) -> Self {
        Self {
            refreshes: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            default_status,
            create_fails: false,
            merge_fails: false,
            merged: AtomicBool::new(false),
            create_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            merge_calls: AtomicUsize::new(0),
        }
    }

    fn push_refresh(&self, step: Refresh) {
        self.refreshes.lock().unwrap().push_back(step);
    }

    fn push_status(&self, status: CommitStatus) {
        self.statuses.lock().unwrap().push_back(status);
    }
}

#[async_trait]
impl GitProvider for ScriptedProvider {
    async fn create_pull_request(
        &self,
        _base: &str,
        _head: &str,
        _title: &str,
        _body: &str,
    ) -> Result<PullRequestHandle, ProviderError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.create_fails {
            return Err(ProviderError::transient("create rejected"));
        }
        Ok(PullRequestHandle::new(PR_URL, 1))
    }

    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.refreshes.lock().unwrap().pop_front();
        match step {
            Some(Refresh::State { merged, closed }) => {
                handle.merged = Some(merged);
                handle.closed = closed;
                handle.head_commit_sha = "abc123".to_string();
                Ok(())
            }
            Some(Refresh::Fail(err)) => Err(err),
            None => {
                handle.merged = Some(self.merged.load(Ordering::SeqCst));
                handle.closed = false;
                handle.head_commit_sha = "abc123".to_string();
                Ok(())
            }
        }
    }

    async fn last_commit_status(
        &self,
        _handle: &PullRequestHandle,
    ) -> Result<CommitStatus, ProviderError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_status))
    }

    async fn merge_pull_request(
        &self,
        _handle: &PullRequestHandle,
        _message: &str,
    ) -> Result<(), ProviderError> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if self.merge_fails {
            return Err(ProviderError::transient("merge rejected"));
        }
        self.merged.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn add_comment(
        &self,
        _handle: &PullRequestHandle,
        _text: &str,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn register_webhook(
        &self,
        _url: &str,
        _secret: Option<&str>,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// A git seam that records calls instead of shelling out.
#[derive(Default)]
struct RecordingGit {
    calls: Mutex<Vec<(PathBuf, String, String)>>,
}

#[async_trait]
impl GitWorkspace for RecordingGit {
    async fn commit_and_push(
        &self,
        path: &Path,
        branch: &str,
        message: &str,
    ) -> Result<(), GitError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), branch.to_string(), message.to_string()));
        Ok(())
    }
}

fn checkout_with_manifest() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("requirements.yaml"), MANIFEST).unwrap();
    temp
}

fn request(checkout: &TempDir, mutation: ManifestMutation) -> PromotionRequest {
    PromotionRequest::new(
        checkout.path().to_path_buf(),
        "promote-app-a",
        "Promote app-a to 1.1.0",
        mutation,
    )
    .with_poll_interval(Duration::from_secs(1))
    .with_timeout(Duration::from_secs(60))
}

fn engine(provider: &Arc<ScriptedProvider>, git: &Arc<RecordingGit>) -> PromotionEngine {
    PromotionEngine::new(provider.clone(), git.clone())
}

#[tokio::test(start_paused = true)]
async fn happy_path_merges_after_ci_greenlights() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Success));
    provider.push_refresh(Refresh::State {
        merged: false,
        closed: false,
    });
    provider.push_refresh(Refresh::State {
        merged: false,
        closed: false,
    });
    provider.push_status(CommitStatus::Pending);
    provider.push_status(CommitStatus::Success);
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::Merged);
    assert!(result.merged());
    assert_eq!(result.handle.unwrap().url, PR_URL);
    assert_eq!(provider.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.merge_calls.load(Ordering::SeqCst), 1);

    // The checkout was mutated in place and pushed with a derived message.
    let mutated = std::fs::read_to_string(checkout.path().join("requirements.yaml")).unwrap();
    assert!(mutated.contains("1.1.0"));
    assert!(mutated.contains("app-b"));
    let calls = git.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "promote-app-a");
    assert_eq!(calls[0].2, "chore: Promote app-a to 1.1.0");
}

#[tokio::test(start_paused = true)]
async fn closed_pull_request_is_a_terminal_failure() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    provider.push_refresh(Refresh::State {
        merged: false,
        closed: false,
    });
    provider.push_refresh(Refresh::State {
        merged: false,
        closed: false,
    });
    provider.push_refresh(Refresh::State {
        merged: false,
        closed: true,
    });
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::ClosedWithoutMerge);
    assert_eq!(provider.merge_calls.load(Ordering::SeqCst), 0);
    // Terminal states are sinks: polling stopped at the closing tick.
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_ci_polls_until_the_timeout() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Failure));
    let git = Arc::new(RecordingGit::default());

    let poll_interval = Duration::from_secs(1);
    let timeout = Duration::from_secs(2);
    let checkout = checkout_with_manifest();
    let promotion = request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0"))
        .with_poll_interval(poll_interval)
        .with_timeout(timeout);

    let result = engine(&provider, &git).promote(&promotion).await.unwrap();

    assert_eq!(result.outcome, PromotionOutcome::TimedOut);
    assert_eq!(result.last_commit_status, Some(CommitStatus::Failure));
    assert_eq!(provider.merge_calls.load(Ordering::SeqCst), 0);
    // The run ends no earlier than the timeout and within one extra tick.
    assert!(result.elapsed >= timeout);
    assert!(result.elapsed < timeout + poll_interval);
}

#[tokio::test(start_paused = true)]
async fn merged_wins_when_a_provider_reports_merged_and_closed() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    provider.push_refresh(Refresh::State {
        merged: true,
        closed: true,
    });
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::Merged);
}

#[tokio::test]
async fn no_op_mutation_never_opens_a_pull_request() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    // app-a is already at 1.0.0
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.0.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::PublishFailed);
    assert!(result.skipped());
    assert!(result.handle.is_none());
    assert_eq!(provider.create_calls.load(Ordering::SeqCst), 0);
    assert!(git.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn removing_an_absent_dependency_is_a_skip() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::remove("app-z")))
        .await
        .unwrap();

    assert!(result.skipped());
    assert_eq!(provider.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_refresh_errors_are_absorbed() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    provider.push_refresh(Refresh::Fail(ProviderError::transient("flaky endpoint")));
    provider.push_refresh(Refresh::Fail(ProviderError::transient("flaky endpoint")));
    provider.push_refresh(Refresh::State {
        merged: true,
        closed: false,
    });
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::Merged);
    assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn fatal_provider_errors_abort_polling() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    provider.push_refresh(Refresh::Fail(ProviderError::fatal("bad credentials")));
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let err = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap_err();

    assert!(err.is_fatal());
}

#[tokio::test(start_paused = true)]
async fn observe_only_mode_never_merges() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Success));
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let promotion = request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0"))
        .with_timeout(Duration::from_secs(2))
        .with_auto_merge(false);

    let result = engine(&provider, &git).promote(&promotion).await.unwrap();

    assert_eq!(result.outcome, PromotionOutcome::TimedOut);
    assert_eq!(provider.merge_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_reports_a_timeout() {
    let provider = Arc::new(ScriptedProvider::new(CommitStatus::Pending));
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let promotion = request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0"))
        .with_timeout(Duration::from_secs(3600));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = engine(&provider, &git);
    let (result, ()) = tokio::join!(engine.promote_with_shutdown(&promotion, shutdown_rx), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = shutdown_tx.send(true);
    });
    let result = result.unwrap();

    assert_eq!(result.outcome, PromotionOutcome::TimedOut);
    assert!(result.elapsed < Duration::from_secs(3600));
}

#[tokio::test]
async fn create_failure_reports_publish_failed() {
    let mut scripted = ScriptedProvider::new(CommitStatus::Pending);
    scripted.create_fails = true;
    let provider = Arc::new(scripted);
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let result = engine(&provider, &git)
        .promote(&request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0")))
        .await
        .unwrap();

    assert_eq!(result.outcome, PromotionOutcome::PublishFailed);
    assert!(matches!(
        result.publish_error,
        Some(PublishError::Provider(_))
    ));
    assert!(!result.skipped());
}

#[tokio::test(start_paused = true)]
async fn merge_rejections_are_retried_until_timeout() {
    let mut scripted = ScriptedProvider::new(CommitStatus::Success);
    scripted.merge_fails = true;
    let provider = Arc::new(scripted);
    let git = Arc::new(RecordingGit::default());

    let checkout = checkout_with_manifest();
    let promotion = request(&checkout, ManifestMutation::upgrade("app-a", "1.1.0"))
        .with_timeout(Duration::from_secs(2));

    let result = engine(&provider, &git).promote(&promotion).await.unwrap();

    assert_eq!(result.outcome, PromotionOutcome::TimedOut);
    // One attempt per tick: the rejection never escalates to a failure.
    assert_eq!(provider.merge_calls.load(Ordering::SeqCst), 3);
}
