//! GitLab adapter speaking the v4 REST API.

use crate::provider::rest::{expect_success, http_client, trim_base};
use crate::provider::{
    CommitStatus, Credentials, GitProvider, ProviderError, PullRequestHandle, RepositorySlug,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// GitLab implementation of [`GitProvider`].
///
/// Merge requests are mapped onto the uniform pull-request handle: the iid
/// becomes the handle number and the `merged` state becomes the merge flag.
pub struct GitlabProvider {
    http: reqwest::Client,
    api_base: String,
    project: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    iid: u64,
    web_url: String,
    state: String,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    #[serde(default)]
    status: Option<String>,
}

impl GitlabProvider {
    /// Builds a client for one project on a GitLab server.
    pub fn new(
        server_url: &str,
        repo: RepositorySlug,
        credentials: Credentials,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client()?,
            api_base: format!("{}/api/v4", trim_base(server_url)),
            // GitLab addresses projects by URL-encoded full path
            project: format!("{}%2F{}", repo.owner, repo.name),
            token: credentials.token,
        })
    }

    fn mr_url(&self, iid: u64) -> String {
        format!("{}/projects/{}/merge_requests/{iid}", self.api_base, self.project)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http.request(method, url).header("PRIVATE-TOKEN", &self.token)
    }

    async fn fetch_mr(&self, iid: u64) -> Result<MergeRequest, ProviderError> {
        let response = self.request(reqwest::Method::GET, self.mr_url(iid)).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

/// Maps a GitLab pipeline status onto the uniform commit status.
pub(crate) fn map_pipeline_status(status: Option<&str>) -> CommitStatus {
    match status {
        Some("success") => CommitStatus::Success,
        Some("failed") => CommitStatus::Failure,
        Some("canceled") => CommitStatus::Error,
        Some(
            "created" | "waiting_for_resource" | "preparing" | "pending" | "running" | "manual"
            | "scheduled",
        ) => CommitStatus::Pending,
        _ => CommitStatus::Unknown,
    }
}

#[async_trait]
impl GitProvider for GitlabProvider {
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, ProviderError> {
        let payload = serde_json::json!({
            "source_branch": head,
            "target_branch": base,
            "title": title,
            "description": body,
        });
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/projects/{}/merge_requests", self.api_base, self.project),
            )
            .json(&payload)
            .send()
            .await?;
        let mr: MergeRequest = expect_success(response).await?.json().await?;

        debug!(pr = %mr.web_url, "Created merge request");
        let mut handle = PullRequestHandle::new(mr.web_url, mr.iid);
        handle.head_commit_sha = mr.sha.unwrap_or_default();
        Ok(handle)
    }

    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError> {
        let mr = self.fetch_mr(handle.number).await?;
        handle.merged = Some(mr.state == "merged");
        handle.closed = mr.state == "closed" || mr.state == "merged";
        if let Some(sha) = mr.sha {
            handle.head_commit_sha = sha;
        }
        Ok(())
    }

    async fn last_commit_status(
        &self,
        handle: &PullRequestHandle,
    ) -> Result<CommitStatus, ProviderError> {
        let response = self
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/projects/{}/repository/commits/{}",
                    self.api_base, self.project, handle.head_commit_sha
                ),
            )
            .send()
            .await?;
        let commit: Commit = expect_success(response).await?.json().await?;
        Ok(map_pipeline_status(commit.status.as_deref()))
    }

    async fn merge_pull_request(
        &self,
        handle: &PullRequestHandle,
        message: &str,
    ) -> Result<(), ProviderError> {
        if handle.is_merged() {
            return Ok(());
        }

        let payload = serde_json::json!({ "merge_commit_message": message });
        let response = self
            .request(reqwest::Method::PUT, format!("{}/merge", self.mr_url(handle.number)))
            .json(&payload)
            .send()
            .await?;

        match expect_success(response).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // GitLab answers 405 when the MR cannot be merged, which
                // includes one that already merged in the meantime.
                if let Ok(mr) = self.fetch_mr(handle.number).await {
                    if mr.state == "merged" {
                        return Ok(());
                    }
                }
                Err(err)
            }
        }
    }

    async fn add_comment(
        &self,
        handle: &PullRequestHandle,
        text: &str,
    ) -> Result<(), ProviderError> {
        let payload = serde_json::json!({ "body": text });
        let response = self
            .request(reqwest::Method::POST, format!("{}/notes", self.mr_url(handle.number)))
            .json(&payload)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    async fn register_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut payload = serde_json::json!({
            "url": url,
            "push_events": true,
            "merge_requests_events": true,
        });
        if let Some(secret) = secret {
            payload["token"] = serde_json::Value::String(secret.to_string());
        }
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/projects/{}/hooks", self.api_base, self.project),
            )
            .json(&payload)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_pipeline_statuses() {
        assert_eq!(map_pipeline_status(Some("success")), CommitStatus::Success);
        assert_eq!(map_pipeline_status(Some("failed")), CommitStatus::Failure);
        assert_eq!(map_pipeline_status(Some("canceled")), CommitStatus::Error);
        assert_eq!(map_pipeline_status(Some("running")), CommitStatus::Pending);
        assert_eq!(map_pipeline_status(Some("skipped")), CommitStatus::Unknown);
        assert_eq!(map_pipeline_status(None), CommitStatus::Unknown);
    }
}
