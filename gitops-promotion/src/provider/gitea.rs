//! Gitea adapter speaking the v1 REST API.

use crate::provider::rest::{expect_success, http_client, trim_base};
use crate::provider::{
    CommitStatus, Credentials, GitProvider, ProviderError, PullRequestHandle, RepositorySlug,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Gitea implementation of [`GitProvider`].
pub struct GiteaProvider {
    http: reqwest::Client,
    api_base: String,
    repo: RepositorySlug,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    html_url: String,
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    head: Option<HeadRef>,
}

#[derive(Debug, Deserialize)]
struct HeadRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CombinedStatus {
    state: String,
}

impl GiteaProvider {
    /// Builds a client for one repository on a Gitea server.
    pub fn new(
        server_url: &str,
        repo: RepositorySlug,
        credentials: Credentials,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client()?,
            api_base: format!("{}/api/v1", trim_base(server_url)),
            repo,
            token: credentials.token,
        })
    }

    fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}{tail}", self.api_base, self.repo.owner, self.repo.name)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
    }

    async fn fetch_pull(&self, number: u64) -> Result<PullRequest, ProviderError> {
        let response = self
            .request(reqwest::Method::GET, self.repo_url(&format!("/pulls/{number}")))
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

#[async_trait]
impl GitProvider for GiteaProvider {
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, ProviderError> {
        let payload = serde_json::json!({
            "base": base,
            "head": head,
            "title": title,
            "body": body,
        });
        let response = self
            .request(reqwest::Method::POST, self.repo_url("/pulls"))
            .json(&payload)
            .send()
            .await?;
        let pr: PullRequest = expect_success(response).await?.json().await?;

        debug!(pr = %pr.html_url, "Created pull request");
        let mut handle = PullRequestHandle::new(pr.html_url, pr.number);
        handle.head_commit_sha = pr.head.map(|h| h.sha).unwrap_or_default();
        Ok(handle)
    }

    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError> {
        let pr = self.fetch_pull(handle.number).await?;
        handle.merged = Some(pr.merged);
        handle.closed = pr.state == "closed";
        if let Some(head) = pr.head {
            handle.head_commit_sha = head.sha;
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
                self.repo_url(&format!("/commits/{}/status", handle.head_commit_sha)),
            )
            .send()
            .await?;
        let combined: CombinedStatus = expect_success(response).await?.json().await?;
        Ok(CommitStatus::from_state(&combined.state))
    }

    async fn merge_pull_request(
        &self,
        handle: &PullRequestHandle,
        message: &str,
    ) -> Result<(), ProviderError> {
        if handle.is_merged() {
            return Ok(());
        }

        let payload = serde_json::json!({
            "Do": "merge",
            "MergeMessageField": message,
        });
        let response = self
            .request(
                reqwest::Method::POST,
                self.repo_url(&format!("/pulls/{}/merge", handle.number)),
            )
            .json(&payload)
            .send()
            .await?;

        match expect_success(response).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Ok(pr) = self.fetch_pull(handle.number).await {
                    if pr.merged {
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
            .request(
                reqwest::Method::POST,
                self.repo_url(&format!("/issues/{}/comments", handle.number)),
            )
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
        let mut config = serde_json::json!({ "url": url, "content_type": "json" });
        if let Some(secret) = secret {
            config["secret"] = serde_json::Value::String(secret.to_string());
        }
        let payload = serde_json::json!({
            "type": "gitea",
            "active": true,
            "events": ["push", "pull_request"],
            "config": config,
        });
        let response = self
            .request(reqwest::Method::POST, self.repo_url("/hooks"))
            .json(&payload)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}
