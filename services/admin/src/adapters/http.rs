//! services/admin/src/adapters/http.rs
//!
//! The request plumbing shared by the backend and email adapters: bearer
//! token injection, the per-request timeout, and 401 handling.

use feedback_core::ports::{KeyValueStore, PortError, PortResult};
use feedback_core::storage::{clear_credentials, AUTH_TOKEN_KEY};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where the front-end sends the operator after credentials are rejected.
pub const LOGIN_PATH: &str = "/login";

/// A `reqwest` client that signs requests with the stored token.
#[derive(Clone)]
pub struct AuthorizedClient {
    client: Client,
    store: Arc<dyn KeyValueStore>,
}

impl AuthorizedClient {
    /// Every request is bounded by `timeout`.
    pub fn new(timeout: Duration, store: Arc<dyn KeyValueStore>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, store })
    }

    fn bearer_token(&self) -> Option<String> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "Could not read the stored auth token");
                None
            }
        }
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and decodes the body as JSON, falling back to a
    /// JSON string for plain-text bodies. `label` names the call in errors.
    ///
    /// A 401 clears the stored credentials before failing, so the next page
    /// load lands on the login screen.
    pub async fn execute(&self, builder: RequestBuilder, label: &str) -> PortResult<Value> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Unexpected(format!("Request to {} timed out", label))
            } else {
                PortError::Unexpected(format!("Request to {} failed: {}", label, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(path = label, redirect = LOGIN_PATH, "Backend rejected our credentials; clearing them");
            clear_credentials(self.store.as_ref());
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            warn!(path = label, status = status.as_u16(), "Backend returned an error status");
            return Err(PortError::Http {
                status: status.as_u16(),
                path: label.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| {
            PortError::Unexpected(format!("Failed to read response from {}: {}", label, e))
        })?;
        debug!(path = label, bytes = text.len(), "Backend call succeeded");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
