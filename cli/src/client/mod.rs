//! HTTP client plumbing for TIDAL API calls.
//!
//! - [`build_http_client`] - base `reqwest` client with user agent and timeout
//! - [`middleware`] - token refresh and bearer injection stages
//! - [`RequestOptions`] / [`ApiResponse`] - request inputs and buffered responses

pub mod middleware;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TidalError};

/// Build the base HTTP client shared by auth and API calls.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(format!("tidal-bridge/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

/// Query parameters and an optional JSON body for an API request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Set the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.json = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// A successful API response, fully buffered.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Deserialize the body.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Serialization`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as untyped JSON. An empty body reads as `null`.
    pub fn json_value(&self) -> Result<serde_json::Value> {
        if self.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        self.json()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Turn a non-success status into the matching error.
pub(crate) fn status_error(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> TidalError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        TidalError::RateLimited { body, retry_after }
    } else {
        TidalError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

/// Parse a `Retry-After` header given in seconds.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(3)),
            "slow down".into(),
        );
        assert!(matches!(
            err,
            TidalError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn other_statuses_are_api_errors() {
        let err = status_error(StatusCode::BAD_GATEWAY, None, "upstream".into());
        assert!(matches!(err, TidalError::Api { status: 502, ref body } if body == "upstream"));
    }

    #[test]
    fn retry_after_reads_seconds_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn empty_body_is_null() {
        let response = ApiResponse {
            status: StatusCode::NO_CONTENT,
            body: Vec::new(),
        };
        assert_eq!(response.json_value().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn options_collect_params() {
        let options = RequestOptions::new().param("limit", 10).param("countryCode", "US");
        assert_eq!(
            options.params,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("countryCode".to_string(), "US".to_string())
            ]
        );
    }
}
