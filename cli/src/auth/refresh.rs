//! Refresh-token grant.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;

use crate::auth::authenticator::{Authenticator, FormReply};
use crate::auth::credentials::ClientCredentials;
use crate::auth::tokens::{OAuthErrorBody, TokenPair, TokenResponse};
use crate::error::{Result, TidalError};

/// Exchanges a refresh token for a new token pair.
///
/// Sessions depend on this trait rather than on [`Authenticator`] so the
/// token lifecycle can be exercised without an auth server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Run the refresh grant for `refresh_token` on behalf of `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::TokenExpired`] when the server rejects the refresh
    /// token; any other error leaves the token usable for a later attempt.
    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenPair>;
}

impl Authenticator {
    /// Exchange `current_refresh_token` for a new pair using this client's credentials.
    ///
    /// The server may rotate the refresh token. Always keep the returned pair.
    pub async fn refresh_token(&self, current_refresh_token: &str) -> Result<TokenPair> {
        let credentials = self.credentials.clone();
        self.refresh(&credentials, current_refresh_token).await
    }
}

#[async_trait]
impl TokenRefresher for Authenticator {
    async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenPair> {
        if refresh_token.is_empty() {
            return Err(TidalError::TokenExpired(
                "No refresh token available".to_string(),
            ));
        }

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
            ("scope", self.scope()),
        ];
        form.extend(credentials.form_fields());

        let issued_at = Utc::now();
        let FormReply {
            status,
            retry_after,
            body,
        } = self.post_form(&self.token_url, &form).await?;

        if status.is_success() {
            let response: TokenResponse = serde_json::from_str(&body)?;
            return response.into_token_pair(issued_at, Some(refresh_token));
        }

        Err(refresh_failure(status, retry_after, body))
    }
}

/// Map a failed refresh response onto the error taxonomy.
///
/// Only a refused grant (400, 401 or 403) is terminal. Throttling, request
/// timeouts and server errors leave the refresh token usable.
fn refresh_failure(
    status: StatusCode,
    retry_after: Option<std::time::Duration>,
    body: String,
) -> TidalError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let error = OAuthErrorBody::parse(&body);
            let reason = error
                .error_description
                .or(error.error)
                .unwrap_or_else(|| format!("refresh rejected with status {status}"));
            tracing::warn!(%status, "refresh token rejected by auth server");
            TidalError::TokenExpired(reason)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!(?retry_after, "refresh throttled by auth server");
            TidalError::RateLimited { body, retry_after }
        }
        StatusCode::REQUEST_TIMEOUT => TidalError::Timeout,
        _ => TidalError::Auth(format!(
            "Token refresh failed ({}): {body}",
            status.as_u16()
        )),
    }
}
