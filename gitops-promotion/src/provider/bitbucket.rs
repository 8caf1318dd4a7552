//! BitBucket Cloud adapter speaking the 2.0 REST API.

use crate::provider::rest::{expect_success, http_client, trim_base};
use crate::provider::{
    CommitStatus, Credentials, GitProvider, ProviderError, PullRequestHandle, RepositorySlug,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// BitBucket implementation of [`GitProvider`].
///
/// BitBucket reports a single `state` per pull request (OPEN, MERGED,
/// DECLINED, SUPERSEDED) and per-commit build statuses as a list; both are
/// folded onto the uniform handle and commit-status types.
pub struct BitBucketProvider {
    http: reqwest::Client,
    api_base: String,
    repo: RepositorySlug,
    username: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    id: u64,
    state: String,
    #[serde(default)]
    links: Links,
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    html: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(default)]
    commit: Option<CommitRef>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusPage {
    #[serde(default)]
    values: Vec<BuildStatus>,
}

#[derive(Debug, Deserialize)]
struct BuildStatus {
    state: String,
}

impl BitBucketProvider {
    /// Builds a client for one repository on a BitBucket server.
    pub fn new(
        server_url: &str,
        repo: RepositorySlug,
        credentials: Credentials,
    ) -> Result<Self, ProviderError> {
        let base = trim_base(server_url);
        // The public cloud API lives on api.bitbucket.org, not the web host
        let api_base = if base.ends_with("bitbucket.org") {
            "https://api.bitbucket.org/2.0".to_string()
        } else {
            format!("{base}/2.0")
        };
        Ok(Self {
            http: http_client()?,
            api_base,
            repo,
            username: credentials.username,
            token: credentials.token,
        })
    }

    fn pr_url(&self, tail: &str) -> String {
        format!(
            "{}/repositories/{}/{}/pullrequests{tail}",
            self.api_base, self.repo.owner, self.repo.name
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.token))
    }

    async fn fetch_pull(&self, id: u64) -> Result<PullRequest, ProviderError> {
        let response = self
            .request(reqwest::Method::GET, self.pr_url(&format!("/{id}")))
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

/// Folds a page of BitBucket build statuses into one combined status.
pub(crate) fn fold_build_statuses(states: &[&str]) -> CommitStatus {
    if states.is_empty() {
        return CommitStatus::Unknown;
    }
    if states.iter().any(|s| *s == "FAILED") {
        return CommitStatus::Failure;
    }
    if states.iter().any(|s| *s == "STOPPED") {
        return CommitStatus::Error;
    }
    if states.iter().any(|s| *s == "INPROGRESS") {
        return CommitStatus::Pending;
    }
    if states.iter().all(|s| *s == "SUCCESSFUL") {
        return CommitStatus::Success;
    }
    CommitStatus::Unknown
}

#[async_trait]
impl GitProvider for BitBucketProvider {
    async fn create_pull_request(
        &self,
        base: &str,
        head: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, ProviderError> {
        let payload = serde_json::json!({
            "title": title,
            "description": body,
            "source": { "branch": { "name": head } },
            "destination": { "branch": { "name": base } },
        });
        let response = self
            .request(reqwest::Method::POST, self.pr_url(""))
            .json(&payload)
            .send()
            .await?;
        let pr: PullRequest = expect_success(response).await?.json().await?;

        let url = pr
            .links
            .html
            .map(|l| l.href)
            .unwrap_or_else(|| self.pr_url(&format!("/{}", pr.id)));
        debug!(pr = %url, "Created pull request");

        let mut handle = PullRequestHandle::new(url, pr.id);
        handle.head_commit_sha = pr
            .source
            .and_then(|s| s.commit)
            .map(|c| c.hash)
            .unwrap_or_default();
        Ok(handle)
    }

    async fn refresh_status(&self, handle: &mut PullRequestHandle) -> Result<(), ProviderError> {
        let pr = self.fetch_pull(handle.number).await?;
        handle.merged = Some(pr.state == "MERGED");
        handle.closed = matches!(pr.state.as_str(), "MERGED" | "DECLINED" | "SUPERSEDED");
        if let Some(hash) = pr.source.and_then(|s| s.commit).map(|c| c.hash) {
            handle.head_commit_sha = hash;
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
                    "{}/repositories/{}/{}/commit/{}/statuses",
                    self.api_base, self.repo.owner, self.repo.name, handle.head_commit_sha
                ),
            )
            .send()
            .await?;
        let page: StatusPage = expect_success(response).await?.json().await?;
        let states: Vec<&str> = page.values.iter().map(|s| s.state.as_str()).collect();
        Ok(fold_build_statuses(&states))
    }

    async fn merge_pull_request(
        &self,
        handle: &PullRequestHandle,
        message: &str,
    ) -> Result<(), ProviderError> {
        if handle.is_merged() {
            return Ok(());
        }

        let payload = serde_json::json!({ "message": message });
        let response = self
            .request(
                reqwest::Method::POST,
                self.pr_url(&format!("/{}/merge", handle.number)),
            )
            .json(&payload)
            .send()
            .await?;

        match expect_success(response).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Ok(pr) = self.fetch_pull(handle.number).await {
                    if pr.state == "MERGED" {
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
        let payload = serde_json::json!({ "content": { "raw": text } });
        let response = self
            .request(
                reqwest::Method::POST,
                self.pr_url(&format!("/{}/comments", handle.number)),
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
        _secret: Option<&str>,
    ) -> Result<(), ProviderError> {
        // BitBucket Cloud webhooks carry no shared secret in this API version
        let payload = serde_json::json!({
            "description": "promotion webhook",
            "url": url,
            "active": true,
            "events": ["repo:push", "pullrequest:fulfilled", "pullrequest:rejected"],
        });
        let response = self
            .request(
                reqwest::Method::POST,
                format!(
                    "{}/repositories/{}/{}/hooks",
                    self.api_base, self.repo.owner, self.repo.name
                ),
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
    fn folds_build_statuses() {
        assert_eq!(fold_build_statuses(&[]), CommitStatus::Unknown);
        assert_eq!(
            fold_build_statuses(&["SUCCESSFUL", "SUCCESSFUL"]),
            CommitStatus::Success
        );
        assert_eq!(
            fold_build_statuses(&["SUCCESSFUL", "FAILED"]),
            CommitStatus::Failure
        );
        assert_eq!(
            fold_build_statuses(&["SUCCESSFUL", "INPROGRESS"]),
            CommitStatus::Pending
        );
        assert_eq!(fold_build_statuses(&["STOPPED"]), CommitStatus::Error);
    }
}
