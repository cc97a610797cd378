//! Application configuration settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::ClientCredentials;
use crate::error::{Result, TidalError};

/// Default port of the local service that receives the PKCE redirect.
pub const DEFAULT_CALLBACK_PORT: u16 = 5050;

const DEFAULT_API_URL: &str = "https://api.tidal.com/v1/";
const DEFAULT_AUTH_URL: &str = "https://auth.tidal.com/v1/oauth2/";
const DEFAULT_LOGIN_URL: &str = "https://login.tidal.com/authorize";
const SESSION_FILE_NAME: &str = "tidal-session-oauth.json";

/// Main configuration for tidal-bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TidalConfig {
    /// Vendor REST API base URL. Request paths are resolved against it.
    #[serde(with = "url_serde")]
    pub api_base_url: Url,
    /// OAuth base URL hosting the `token` and `device_authorization` endpoints.
    #[serde(with = "url_serde")]
    pub auth_base_url: Url,
    /// Browser login page for the PKCE flow.
    #[serde(with = "url_serde")]
    pub login_url: Url,
    /// OAuth client ID.
    pub client_id: Option<String>,
    /// OAuth client secret. Presence selects the PKCE flow by default.
    pub client_secret: Option<String>,
    /// PKCE redirect URI. Derived from `callback_port` when unset.
    pub redirect_uri: Option<String>,
    /// Port used for the default redirect URI.
    pub callback_port: u16,
    /// Requested OAuth scopes.
    pub scopes: Vec<String>,
    /// Timeout for every outbound HTTP call, in seconds.
    pub request_timeout_secs: u64,
    /// How long to wait for the PKCE redirect, in seconds.
    pub callback_timeout_secs: u64,
    /// Refresh this many seconds before the access token expires.
    pub refresh_margin_secs: u64,
    /// Where the session is persisted. Defaults to a file in the temp dir.
    pub session_file: Option<PathBuf>,
}

impl Default for TidalConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_URL).expect("valid default URL"),
            auth_base_url: Url::parse(DEFAULT_AUTH_URL).expect("valid default URL"),
            login_url: Url::parse(DEFAULT_LOGIN_URL).expect("valid default URL"),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            callback_port: DEFAULT_CALLBACK_PORT,
            scopes: vec!["r_usr".into(), "w_usr".into(), "w_sub".into()],
            request_timeout_secs: 30,
            callback_timeout_secs: 120,
            refresh_margin_secs: 60,
            session_file: None,
        }
    }
}

/// Custom serde module for URL serialization.
mod url_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const API_URL: &str = "TIDAL_API_URL";
    pub const AUTH_URL: &str = "TIDAL_AUTH_URL";
    pub const CLIENT_ID: &str = "TIDAL_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "TIDAL_CLIENT_SECRET";
    pub const REDIRECT_URI: &str = "TIDAL_REDIRECT_URI";
    pub const CALLBACK_PORT: &str = "TIDAL_MCP_PORT";
    pub const SESSION_FILE: &str = "TIDAL_SESSION_FILE";
    pub const LOG_LEVEL: &str = "TIDAL_LOG";
}

impl TidalConfig {
    /// Apply environment variable overrides to the configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(parsed) = lookup(env::API_URL).and_then(|u| Url::parse(&u).ok()) {
            self.api_base_url = parsed;
        }
        if let Some(parsed) = lookup(env::AUTH_URL).and_then(|u| Url::parse(&u).ok()) {
            self.auth_base_url = parsed;
        }
        if let Some(id) = lookup(env::CLIENT_ID).filter(|v| !v.is_empty()) {
            self.client_id = Some(id);
        }
        if let Some(secret) = lookup(env::CLIENT_SECRET).filter(|v| !v.is_empty()) {
            self.client_secret = Some(secret);
        }
        if let Some(uri) = lookup(env::REDIRECT_URI).filter(|v| !v.is_empty()) {
            self.redirect_uri = Some(uri);
        }
        if let Some(port) = lookup(env::CALLBACK_PORT).and_then(|p| p.parse().ok()) {
            self.callback_port = port;
        }
        if let Some(path) = lookup(env::SESSION_FILE).filter(|v| !v.is_empty()) {
            self.session_file = Some(PathBuf::from(path));
        }

        self
    }

    /// Whether custom developer credentials are configured.
    #[must_use]
    pub const fn uses_custom_credentials(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Client credentials for the auth flows.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] when no client ID is configured.
    pub fn credentials(&self) -> Result<ClientCredentials> {
        let id = self.client_id.clone().ok_or_else(|| {
            TidalError::Config(format!(
                "No OAuth client ID configured. Set {} or 'client_id' in the config file.",
                env::CLIENT_ID
            ))
        })?;
        Ok(ClientCredentials::new(id, self.client_secret.clone()))
    }

    /// The PKCE redirect URI, falling back to the local callback route.
    pub fn redirect_uri(&self) -> Result<Url> {
        match &self.redirect_uri {
            Some(uri) => Ok(Url::parse(uri)?),
            None => Ok(Url::parse(&format!(
                "http://localhost:{}/api/auth/callback",
                self.callback_port
            ))?),
        }
    }

    /// API base with a trailing slash so relative paths join under it.
    #[must_use]
    pub fn api_base(&self) -> Url {
        with_trailing_slash(&self.api_base_url)
    }

    /// OAuth token endpoint.
    pub fn token_url(&self) -> Result<Url> {
        Ok(with_trailing_slash(&self.auth_base_url).join("token")?)
    }

    /// OAuth device authorization endpoint.
    pub fn device_auth_url(&self) -> Result<Url> {
        Ok(with_trailing_slash(&self.auth_base_url).join("device_authorization")?)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    #[must_use]
    pub const fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    /// Path of the persisted session file.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(SESSION_FILE_NAME))
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}
