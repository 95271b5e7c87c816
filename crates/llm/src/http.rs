//! Shared HTTP plumbing for provider clients.
//!
//! Maps transport and status failures onto the typed provider errors so that
//! callers can tell timeouts, transient outages and permanent rejections apart.

use handbook_core::{AppError, ProviderKind};
use reqwest::StatusCode;
use std::time::Duration;

/// Build a reqwest client with connect and request timeouts.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a failed `send()` or body read.
///
/// `timeout` is the request deadline the client was built with.
pub fn transport_error(
    kind: ProviderKind,
    provider: &str,
    timeout: Duration,
    err: reqwest::Error,
) -> AppError {
    if err.is_timeout() {
        return AppError::Timeout {
            operation: format!("{} request to {}", kind, provider),
            after: timeout,
        };
    }

    let message = format!("Request to {} failed: {}", provider, err);
    if err.is_connect() || err.is_request() {
        AppError::transient(kind, message)
    } else {
        AppError::permanent(kind, message)
    }
}

/// Classify a non-success HTTP status.
///
/// Rate limits and server errors are retryable; everything else is not.
pub fn status_error(kind: ProviderKind, provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        AppError::transient(kind, message)
    } else {
        AppError::permanent(kind, message)
    }
}

/// Read the body of a failed response and classify it.
pub async fn error_from_response(
    kind: ProviderKind,
    provider: &str,
    response: reqwest::Response,
) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    status_error(kind, provider, status, &body)
}
