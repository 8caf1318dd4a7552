//! Pull request handle and CI status types.

/// The engine's view of a pull request across backends.
///
/// The handle is created when a pull request is opened and refreshed on each
/// poll tick. Once `merged` is `Some(true)`, or `closed` is true without a
/// merge, the promotion is terminal and the handle is no longer mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHandle {
    /// Web URL of the pull request, used as the log and error key.
    pub url: String,

    /// Backend-local number/iid of the pull request.
    pub number: u64,

    /// Last known commit on the source branch; empty until the first refresh.
    pub head_commit_sha: String,

    /// Tri-state merge flag, set only from provider responses.
    pub merged: Option<bool>,

    /// Whether the pull request is closed.
    pub closed: bool,
}

impl PullRequestHandle {
    /// Creates a handle for a freshly opened pull request.
    #[must_use]
    pub fn new(url: impl Into<String>, number: u64) -> Self {
        Self {
            url: url.into(),
            number,
            head_commit_sha: String::new(),
            merged: None,
            closed: false,
        }
    }

    /// Returns true when the provider has confirmed the merge.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.merged == Some(true)
    }

    /// Returns true when the pull request was closed without merging.
    ///
    /// A merge is the stronger signal: a handle reporting both merged and
    /// closed counts as merged, not as closed.
    #[must_use]
    pub fn is_closed_without_merge(&self) -> bool {
        self.closed && !self.is_merged()
    }
}

/// Combined CI status of the last commit on a pull request's source branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Checks are still running, or none have reported yet.
    Pending,

    /// All checks passed.
    Success,

    /// At least one check failed.
    Failure,

    /// A check errored before completing.
    Error,

    /// The backend reported a state this engine does not recognize.
    Unknown,
}

impl CommitStatus {
    /// Returns the status as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Maps a GitHub-style combined state string.
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        match state {
            "pending" => Self::Pending,
            "success" => Self::Success,
            "failure" => Self::Failure,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}
