//! Token types for authentication.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TidalError};

/// Access/refresh token pair held by a [`Session`](crate::session::Session).
///
/// A refresh produces a new pair; existing pairs are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Long-lived credential used to obtain new access tokens.
    pub refresh_token: String,
    /// Issue time plus the server-reported `expires_in`.
    pub expires_at: DateTime<Utc>,
    /// TIDAL user ID, when the token response carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TokenPair {
    /// Check if the access token is expired or will expire within `margin`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        now >= self.expires_at - margin
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Successful response from the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<TokenUser>,
}

/// User object embedded in some TIDAL token responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUser {
    #[serde(rename = "userId", default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

/// Error body returned by OAuth endpoints on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorBody {
    /// Parse an error body, tolerating non-JSON payloads.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    #[must_use]
    pub fn code(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

impl TokenResponse {
    /// Validate the response and stamp the expiry relative to `issued_at`.
    ///
    /// `fallback_refresh` is carried forward when the server does not rotate
    /// the refresh token; initial grants pass `None` and require one.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Auth`] if a required field is missing.
    pub fn into_token_pair(
        self,
        issued_at: DateTime<Utc>,
        fallback_refresh: Option<&str>,
    ) -> Result<TokenPair> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TidalError::Auth("token response is missing access_token".into()))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| fallback_refresh.map(String::from))
            .ok_or_else(|| TidalError::Auth("token response is missing refresh_token".into()))?;
        let expires_in = self
            .expires_in
            .ok_or_else(|| TidalError::Auth("token response is missing expires_in".into()))?;
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| TidalError::Auth(format!("expires_in out of range: {expires_in}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
            user_id: self.user_id.or_else(|| self.user.and_then(|u| u.user_id)),
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_expiring_at(expires_at: DateTime<Utc>) -> TokenPair {
        TokenPair {
            access_token: "A1".into(),
            refresh_token: "R1".into(),
            expires_at,
            user_id: None,
        }
    }

    #[test]
    fn needs_refresh_inside_margin() {
        let now = Utc::now();
        let pair = pair_expiring_at(now + chrono::Duration::seconds(30));
        assert!(pair.needs_refresh(now, Duration::from_secs(60)));
        assert!(!pair.needs_refresh(now, Duration::from_secs(10)));
    }

    #[test]
    fn needs_refresh_when_past() {
        let now = Utc::now();
        let pair = pair_expiring_at(now - chrono::Duration::seconds(1));
        assert!(pair.needs_refresh(now, Duration::ZERO));
        assert_eq!(pair.remaining(now), Duration::ZERO);
    }

    #[test]
    fn response_stamps_expiry_from_issue_time() {
        let issued = Utc::now();
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"A2","refresh_token":"R2","expires_in":3600,"user_id":12345}"#,
        )
        .unwrap();
        let pair = resp.into_token_pair(issued, None).unwrap();
        assert_eq!(pair.access_token, "A2");
        assert_eq!(pair.refresh_token, "R2");
        assert_eq!(pair.expires_at, issued + chrono::Duration::seconds(3600));
        assert_eq!(pair.user_id.as_deref(), Some("12345"));
    }

    #[test]
    fn response_without_expires_in_is_rejected() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"A2","refresh_token":"R2"}"#).unwrap();
        let err = resp.into_token_pair(Utc::now(), None).unwrap_err();
        assert!(err.to_string().contains("expires_in"));
    }

    #[test]
    fn response_with_huge_expires_in_is_rejected() {
        for expires_in in ["10000000000000", "18446744073709551615"] {
            let resp: TokenResponse = serde_json::from_str(&format!(
                r#"{{"access_token":"A2","refresh_token":"R2","expires_in":{expires_in}}}"#
            ))
            .unwrap();
            let err = resp.into_token_pair(Utc::now(), None).unwrap_err();
            assert!(matches!(err, TidalError::Auth(ref m) if m.contains("out of range")));
        }
    }

    #[test]
    fn response_without_access_token_is_rejected() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"refresh_token":"R2","expires_in":10}"#).unwrap();
        let err = resp.into_token_pair(Utc::now(), None).unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn refresh_token_carried_forward_when_not_rotated() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"A2","expires_in":10}"#).unwrap();
        let pair = resp.into_token_pair(Utc::now(), Some("R1")).unwrap();
        assert_eq!(pair.refresh_token, "R1");
    }

    #[test]
    fn nested_user_id_is_read() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"access_token":"A","refresh_token":"R","expires_in":1,"user":{"userId":987}}"#,
        )
        .unwrap();
        let pair = resp.into_token_pair(Utc::now(), None).unwrap();
        assert_eq!(pair.user_id.as_deref(), Some("987"));
    }

    #[test]
    fn oauth_error_body_tolerates_garbage() {
        assert_eq!(OAuthErrorBody::parse("<html>").code(), "");
        assert_eq!(
            OAuthErrorBody::parse(r#"{"error":"authorization_pending"}"#).code(),
            "authorization_pending"
        );
    }
}
