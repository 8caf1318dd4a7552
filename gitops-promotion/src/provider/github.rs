//! GitHub adapter built on octocrab.

use crate::provider::{
    CommitStatus, Credentials, GitProvider, ProviderError, PullRequestHandle, RepositorySlug,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_SERVER: &str = "https://github.com";

/// GitHub (or GitHub Enterprise) implementation of [`GitProvider`].
pub struct GitHubProvider {
    client: Octocrab,
    repo: RepositorySlug,
}

#[derive(Debug, Deserialize)]
struct PullRequestDetails {
    state: String,
    #[serde(default)]
    merged: bool,
    head: HeadRef,
}

#[derive(Debug, Deserialize)]
struct HeadRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CombinedStatus {
    state: String,
}

impl GitHubProvider {
    /// Builds an authenticated client for one repository.
    ///
    /// A non-default `server_url` selects a GitHub Enterprise API base.
    pub fn new(
        server_url: &str,
        repo: RepositorySlug,
        credentials: Credentials,
    ) -> Result<Self, ProviderError> {
        let mut builder = Octocrab::builder().personal_token(credentials.token);
        if !server_url.is_empty() && server_url.trim_end_matches('/') != DEFAULT_SERVER {
            builder = builder
                .base_uri(server_url)
                .map_err(ProviderError::from)?;
        }
        let client = builder.build().map_err(ProviderError::from)?;
        Ok(Self { client, repo })
    }

    fn pull_route(&self, number: u64) -> String {
        format!("/repos/{}/{}/pulls/{number}", self.repo.owner, self.repo.name)
    }

    async fn fetch_details(&self, number: u64) -> Result<PullRequestDetails, ProviderError> {
        self.client
            .get(self.pull_route(number), None::<&()>)
            .await
            .map_err(ProviderError::from)
    }
}

#[async_trait]
impl GitProvider for GitHubProvider {
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, ProviderError> {
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .create(title, head, base)
            .body(body)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let url = pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| format!("https://github.com/{}/pull/{}", self.repo, pr.number));

        debug!(pr = %url, "Created pull request");
        Ok(PullRequestHandle::new(url, pr.number))
    }

    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError> {
        let details = self.fetch_details(handle.number).await?;
        handle.merged = Some(details.merged);
        handle.closed = details.state == "closed";
        handle.head_commit_sha = details.head.sha;
        Ok(())
    }

    async fn last_commit_status(
        &self,
        handle: &PullRequestHandle,
    ) -> Result<CommitStatus, ProviderError> {
        let combined: CombinedStatus = self
            .client
            .get(
                format!(
                    "/repos/{}/{}/commits/{}/status",
                    self.repo.owner, self.repo.name, handle.head_commit_sha
                ),
                None::<&()>,
            )
            .await
            .map_err(ProviderError::from)?;
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

        let body = serde_json::json!({ "commit_message": message });
        let result: Result<serde_json::Value, octocrab::Error> = self
            .client
            .put(format!("{}/merge", self.pull_route(handle.number)), Some(&body))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                // GitHub rejects merging a merged PR with 405; treat a PR
                // that is merged by the time we re-check as success.
                if let Ok(details) = self.fetch_details(handle.number).await {
                    if details.merged {
                        return Ok(());
                    }
                }
                Err(ProviderError::from(err))
            }
        }
    }

    async fn add_comment(
        &self,
        handle: &PullRequestHandle,
        text: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .issues(&self.repo.owner, &self.repo.name)
            .create_comment(handle.number, text)
            .await
            .map_err(ProviderError::from)?;
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
        let body = serde_json::json!({
            "name": "web",
            "active": true,
            "events": ["push", "pull_request"],
            "config": config,
        });

        let _: serde_json::Value = self
            .client
            .post(
                format!("/repos/{}/{}/hooks", self.repo.owner, self.repo.name),
                Some(&body),
            )
            .await
            .map_err(ProviderError::from)?;
        Ok(())
    }
}
