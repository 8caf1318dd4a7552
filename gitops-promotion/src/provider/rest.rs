//! Shared plumbing for the REST-based adapters.

use crate::provider::ProviderError;

/// Builds the HTTP client shared by the REST adapters.
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::transient(format!("Failed to build HTTP client: {e}")))
}

/// Normalizes a server URL into an API base without a trailing slash.
pub(crate) fn trim_base(server_url: &str) -> String {
    server_url.trim_end_matches('/').to_string()
}

/// Maps a non-success response to a classified provider error.
pub(crate) async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    Err(ProviderError::from_status(
        status.as_u16(),
        format!("{status}: {message}"),
    ))
}
