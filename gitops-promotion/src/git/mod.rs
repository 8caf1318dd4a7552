//! The working-copy commit/push primitive.
//!
//! The engine does not own git plumbing; it consumes this seam. The default
//! [`CommandGit`] implementation shells out to the `git` binary, assuming
//! the checkout's remote and credentials were prepared by the caller.

mod error;

pub use error::GitError;

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Commits and pushes changes inside a repository checkout.
///
/// Implementations may assume exclusive ownership of the checkout for the
/// duration of a call.
#[async_trait]
pub trait GitWorkspace: Send + Sync {
    /// Commits all pending changes on `branch` and pushes the branch to the
    /// checkout's origin remote.
    async fn commit_and_push(
        &self,
        path: &Path,
        branch: &str,
        message: &str,
    ) -> Result<(), GitError>;
}

/// [`GitWorkspace`] backed by the `git` command-line tool.
pub struct CommandGit;

#[async_trait]
impl GitWorkspace for CommandGit {
    async fn commit_and_push(
        &self,
        path: &Path,
        branch: &str,
        message: &str,
    ) -> Result<(), GitError> {
        debug!(branch, "Committing and pushing changes");

        run_git_command(path, &["checkout", "-B", branch]).await?;
        run_git_command(path, &["add", "-A"]).await?;
        run_git_command(path, &["commit", "-m", message]).await?;
        run_git_command(path, &["push", "-u", "origin", &format!("HEAD:{branch}")]).await?;

        Ok(())
    }
}

/// Runs a git command in the given checkout.
async fn run_git_command(path: &Path, args: &[&str]) -> Result<(), GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| GitError::Spawn {
            command: args.join(" "),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed {
            command: args.join(" "),
            message: stderr.trim().to_string(),
        });
    }

    Ok(())
}
