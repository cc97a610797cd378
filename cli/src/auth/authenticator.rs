//! Shared state and transport for the OAuth flows.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::auth::credentials::ClientCredentials;
use crate::client::{build_http_client, retry_after};
use crate::config::TidalConfig;
use crate::error::Result;

/// Raw outcome of a form POST to an auth endpoint.
pub(crate) struct FormReply {
    pub(crate) status: StatusCode,
    pub(crate) retry_after: Option<Duration>,
    pub(crate) body: String,
}

/// Runs the OAuth flows against the configured TIDAL auth server.
///
/// Flow-specific operations live next to their flow: see
/// [`device_flow`](super::device_flow), [`pkce`](super::pkce) and
/// [`refresh`](super::refresh).
pub struct Authenticator {
    pub(crate) http: Client,
    pub(crate) credentials: ClientCredentials,
    pub(crate) token_url: Url,
    pub(crate) device_auth_url: Url,
    pub(crate) login_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) callback_timeout: Duration,
}

impl Authenticator {
    /// Create an authenticator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`](crate::error::TidalError::Config) if no
    /// client ID is configured, or an error if a URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &TidalConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.request_timeout())?,
            credentials: config.credentials()?,
            token_url: config.token_url()?,
            device_auth_url: config.device_auth_url()?,
            login_url: config.login_url.clone(),
            redirect_uri: config.redirect_uri()?,
            scopes: config.scopes.clone(),
            callback_timeout: config.callback_timeout(),
        })
    }

    /// Client credentials used for every grant.
    #[must_use]
    pub const fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Redirect URI the PKCE listener binds to.
    #[must_use]
    pub const fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Configured bound on the PKCE callback wait.
    #[must_use]
    pub const fn callback_timeout(&self) -> Duration {
        self.callback_timeout
    }

    /// Space-separated scope list; form encoding renders it as `r_usr+w_usr+w_sub`.
    #[must_use]
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    /// POST a form-encoded body and return the status, `Retry-After` and raw body.
    ///
    /// OAuth endpoints reject query-string parameters, so every grant goes
    /// through here.
    pub(crate) async fn post_form(&self, url: &Url, form: &[(&str, String)]) -> Result<FormReply> {
        let response = self.http.post(url.clone()).form(form).send().await?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response.text().await?;
        Ok(FormReply {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Configuration pointing every endpoint at a mock server.
    pub fn config_for(server_uri: &str) -> TidalConfig {
        TidalConfig {
            api_base_url: Url::parse(&format!("{server_uri}/v1/")).unwrap(),
            auth_base_url: Url::parse(&format!("{server_uri}/oauth2/")).unwrap(),
            login_url: Url::parse(&format!("{server_uri}/authorize")).unwrap(),
            client_id: Some("test_client_id".into()),
            client_secret: None,
            redirect_uri: Some("http://127.0.0.1:0/api/auth/callback".into()),
            request_timeout_secs: 5,
            ..TidalConfig::default()
        }
    }

    pub fn authenticator_for(server_uri: &str) -> Authenticator {
        Authenticator::new(&config_for(server_uri)).unwrap()
    }
}
