//! OAuth device authorization flow implementation (RFC 8628).

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::auth::authenticator::{Authenticator, FormReply};
use crate::auth::tokens::{OAuthErrorBody, TokenPair, TokenResponse};
use crate::error::{Result, TidalError};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Interval increase mandated by a `slow_down` response.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Response from initiating device authorization.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthChallenge {
    /// Code the token endpoint is polled with.
    pub device_code: String,
    /// Code for the user to enter.
    pub user_code: String,
    /// URL for the user to visit.
    pub verification_uri: String,
    /// Complete URL with code (if available).
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the device code expires.
    pub expires_in: u64,
    /// Minimum seconds between polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

const fn default_interval() -> u64 {
    5
}

impl DeviceAuthChallenge {
    /// Poll interval, never below one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    #[must_use]
    pub const fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// URL to open in a browser, preferring the one with the code embedded.
    ///
    /// TIDAL returns bare hosts such as `link.tidal.com`, so a scheme is added
    /// when missing.
    #[must_use]
    pub fn browser_url(&self) -> String {
        let url = self
            .verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri);
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        }
    }
}

/// Result of one poll of the token endpoint.
#[derive(Debug)]
pub enum PollOutcome {
    /// The user has not finished yet.
    Pending,
    /// The server asked us to poll less often.
    SlowDown,
    /// The user approved; tokens were issued.
    Approved(TokenPair),
}

impl Authenticator {
    /// Start the device authorization flow.
    ///
    /// Returns the verification URL and user code for the user to complete authentication.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Auth`] on any non-2xx response.
    pub async fn start_device_auth(&self) -> Result<DeviceAuthChallenge> {
        let form = [
            ("client_id", self.credentials.id.clone()),
            ("scope", self.scope()),
        ];
        let FormReply { status, body, .. } = self.post_form(&self.device_auth_url, &form).await?;

        if !status.is_success() {
            return Err(TidalError::Auth(format!(
                "Device authorization failed ({}): {body}",
                status.as_u16()
            )));
        }

        let challenge: DeviceAuthChallenge = serde_json::from_str(&body)
            .map_err(|e| TidalError::Auth(format!("Malformed device authorization response: {e}")))?;
        info!(
            expires_in = challenge.expires_in,
            interval = challenge.interval,
            "device authorization started"
        );
        Ok(challenge)
    }

    /// Poll for token completion.
    ///
    /// Waits at least `interval` before every poll and never polls at or
    /// after `expires_in` has elapsed. Dropping the returned future cancels
    /// the flow.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The device code expires ([`TidalError::AuthTimeout`])
    /// - The user denies access ([`TidalError::AuthDenied`])
    /// - The server reports any other OAuth error ([`TidalError::Auth`])
    pub async fn poll_for_token(
        &self,
        device_code: &str,
        interval: Duration,
        expires_in: Duration,
    ) -> Result<TokenPair> {
        if device_code.is_empty() {
            return Err(TidalError::Auth(
                "Device authorization response is missing device_code".to_string(),
            ));
        }
        poll_until(interval, expires_in, || self.poll_device_token(device_code)).await
    }

    /// Poll using the interval and expiry the server handed out.
    pub async fn complete_device_login(&self, challenge: &DeviceAuthChallenge) -> Result<TokenPair> {
        self.poll_for_token(
            &challenge.device_code,
            challenge.interval(),
            challenge.expires_in(),
        )
        .await
    }

    async fn poll_device_token(&self, device_code: &str) -> Result<PollOutcome> {
        let mut form = vec![
            ("grant_type", DEVICE_CODE_GRANT.to_string()),
            ("device_code", device_code.to_string()),
            ("scope", self.scope()),
        ];
        form.extend(self.credentials.form_fields());

        let issued_at = Utc::now();
        let FormReply { status, body, .. } = self.post_form(&self.token_url, &form).await?;

        if status.is_success() {
            let response: TokenResponse = serde_json::from_str(&body)?;
            return response.into_token_pair(issued_at, None).map(PollOutcome::Approved);
        }

        let error = OAuthErrorBody::parse(&body);
        match error.code() {
            "authorization_pending" => Ok(PollOutcome::Pending),
            "slow_down" => Ok(PollOutcome::SlowDown),
            "expired_token" => Err(TidalError::AuthTimeout),
            "access_denied" => Err(TidalError::AuthDenied),
            _ => Err(TidalError::Auth(format!(
                "Token exchange failed ({}): {body}",
                status.as_u16()
            ))),
        }
    }
}

/// Drive `poll` on the device-flow schedule until it resolves or the code expires.
pub(crate) async fn poll_until<F, Fut>(
    mut interval: Duration,
    expires_in: Duration,
    mut poll: F,
) -> Result<TokenPair>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome>>,
{
    let deadline = Instant::now()
        .checked_add(expires_in)
        .ok_or_else(|| TidalError::Auth(format!("device code expires_in out of range: {expires_in:?}")))?;
    let mut attempts = 0_u32;

    loop {
        let next_poll = match Instant::now().checked_add(interval) {
            Some(next) if next < deadline => next,
            _ => {
                debug!(attempts, "device code expired before approval");
                return Err(TidalError::AuthTimeout);
            }
        };
        tokio::time::sleep_until(next_poll).await;

        attempts += 1;
        match poll().await? {
            PollOutcome::Pending => debug!(attempts, "authorization pending"),
            PollOutcome::SlowDown => {
                interval = interval.saturating_add(SLOW_DOWN_STEP);
                debug!(attempts, interval_secs = interval.as_secs(), "server asked to slow down");
            }
            PollOutcome::Approved(pair) => {
                info!(attempts, "device authorization approved");
                return Ok(pair);
            }
        }
    }
}
