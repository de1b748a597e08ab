//! # Sync Transport
//!
//! The port the queue replays mutations through, and its HTTP implementation.
//!
//! ## Replay Request
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       HTTP Replay                                       │
//! │                                                                         │
//! │  POST {api_base_url}/sync/{action}                                     │
//! │  Idempotency-Key: <queue item id>                                      │
//! │  Authorization: Bearer <token>          (when configured)              │
//! │                                                                         │
//! │  { "action": "orders.create", "payload": {...}, "queued_at": "..." }   │
//! │                                                                         │
//! │  Response                    Outcome                                    │
//! │  ────────                    ───────                                    │
//! │  2xx                         Ok(())                                     │
//! │  408 / 429 / 5xx             TransportError { retryable: true }         │
//! │  401                         retryable, drain pauses for new creds      │
//! │  other 4xx                   TransportError { retryable: false }        │
//! │  network error / timeout     TransportError { retryable: true }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ApiSettings;
use crate::error::{SyncError, SyncResult};
use crate::queue::QueueItem;

/// Longest response body excerpt kept in an error message.
const MAX_ERROR_BODY: usize = 200;

// =============================================================================
// Transport Error
// =============================================================================

/// A failed replay attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,

    /// Whether trying again later could succeed.
    pub retryable: bool,

    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl TransportError {
    /// A failure worth retrying (network down, server overloaded).
    pub fn retryable(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
            retryable: true,
            status: None,
        }
    }

    /// A failure that will repeat on every attempt (validation rejection).
    pub fn permanent(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
            retryable: false,
            status: None,
        }
    }

    /// The server refused the credentials. The mutation itself may be fine.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
            retryable: true,
            status: Some(401),
        }
    }

    /// True for a 401: every queued item would fail the same way until the
    /// token is refreshed.
    pub fn is_auth_failure(&self) -> bool {
        self.status == Some(401)
    }
}

// =============================================================================
// Transport Port
// =============================================================================

/// Sends one queued mutation to the server.
///
/// Implementations apply their own per-request timeout; the queue only
/// looks at success or failure.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn replay(&self, item: &QueueItem) -> Result<(), TransportError>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

#[derive(Serialize)]
struct ReplayRequest<'a> {
    action: &'a str,
    payload: &'a serde_json::Value,
    queued_at: DateTime<Utc>,
}

/// Replays mutations against the RestoBill REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Builds the HTTP client from API settings.
    pub fn new(settings: &ApiSettings) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpTransport {
            client,
            base_url: normalize_base(&settings.base_url)?,
            auth_token: settings.auth_token.clone(),
        })
    }

    /// URL an action is replayed to.
    pub fn endpoint(&self, action: &str) -> Result<Url, TransportError> {
        if action.trim().is_empty() {
            return Err(TransportError::permanent("empty action"));
        }

        self.base_url
            .join(&format!("sync/{}", action.trim_start_matches('/')))
            .map_err(|e| TransportError::permanent(format!("bad action '{}': {}", action, e)))
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn replay(&self, item: &QueueItem) -> Result<(), TransportError> {
        let url = self.endpoint(&item.action)?;

        debug!(id = %item.id, action = %item.action, %url, "Replaying mutation");

        let mut request = self
            .client
            .post(url)
            .header("Idempotency-Key", &item.id)
            .json(&ReplayRequest {
                action: &item.action,
                payload: &item.payload,
                queued_at: item.timestamp,
            });

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// Ensures the base URL ends in '/' so `join` appends instead of replacing.
fn normalize_base(raw: &str) -> SyncResult<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Maps a non-success HTTP status to a transport error.
fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let retryable = status.is_server_error()
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;

    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    let message = if excerpt.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, excerpt)
    };

    TransportError {
        message,
        retryable,
        status: Some(status.as_u16()),
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::permanent(err.to_string())
    } else {
        TransportError::retryable(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> ApiSettings {
        ApiSettings {
            base_url: base_url.to_string(),
            request_timeout_secs: 2,
            auth_token: None,
        }
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let transport = HttpTransport::new(&settings("https://api.restobill.in/api")).unwrap();
        assert_eq!(
            transport.endpoint("orders.create").unwrap().as_str(),
            "https://api.restobill.in/api/sync/orders.create"
        );

        let transport = HttpTransport::new(&settings("https://api.restobill.in/api/")).unwrap();
        assert_eq!(
            transport.endpoint("/tables.update").unwrap().as_str(),
            "https://api.restobill.in/api/sync/tables.update"
        );
    }

    #[test]
    fn test_empty_action_is_permanent() {
        let transport = HttpTransport::new(&settings("https://api.restobill.in")).unwrap();
        let err = transport.endpoint("  ").unwrap_err();
        assert!(!err.retryable);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new(&settings("not a url")),
            Err(SyncError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, "").retryable);
        assert!(classify_status(StatusCode::BAD_GATEWAY, "").retryable);
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").retryable);
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, "").retryable);

        let expired = classify_status(StatusCode::UNAUTHORIZED, "token expired");
        assert!(expired.retryable);
        assert!(expired.is_auth_failure());
        assert!(!classify_status(StatusCode::FORBIDDEN, "").retryable);

        let err = classify_status(StatusCode::UNPROCESSABLE_ENTITY, "table 9 does not exist");
        assert!(!err.retryable);
        assert_eq!(err.status, Some(422));
        assert!(err.message.contains("table 9 does not exist"));
    }

    #[test]
    fn test_long_error_body_is_truncated() {
        let body = "x".repeat(1000);
        let err = classify_status(StatusCode::BAD_REQUEST, &body);
        assert!(err.message.len() < 300);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable() {
        let transport = HttpTransport::new(&settings("http://127.0.0.1:1/api")).unwrap();
        let item = QueueItem::new("orders.create", serde_json::json!({"table": 4}));

        let err = transport.replay(&item).await.unwrap_err();
        assert!(err.retryable);
        assert!(err.status.is_none());
    }
}
