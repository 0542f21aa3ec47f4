//! Shared HTTP plumbing for providers

use super::ProviderError;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("lyrisync/", env!("CARGO_PKG_VERSION"));

/// Build the client shared by all providers
///
/// `timeout` bounds every request end to end.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(e.to_string()))
}

/// Send a request and decode a JSON body
///
/// 401 maps to `Unauthorized` so callers can refresh a credential and retry;
/// 404 maps to `Ok(None)`.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Option<T>, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ProviderError::Unauthorized);
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status(status.as_u16(), error_text));
    }

    let body = response.json::<T>().await?;
    Ok(Some(body))
}
