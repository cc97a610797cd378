//! Authenticated TIDAL session.
//!
//! A [`Session`] is the single entry point for API calls. It holds the token
//! pair, refreshes it before it goes stale and attaches it to every request:
//! - [`state`] - token state machine and single-flight refresh
//! - [`storage`] - session file persistence
//!
//! Build one per process and share it as `Arc<Session>`.

pub mod state;
pub mod storage;

pub use state::{TokenKeeper, TokenState, TokenStatus};
pub use storage::{FileSessionStore, SessionStore, StoredSession};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{Authenticator, ClientCredentials, TokenPair, TokenRefresher};
use crate::client::middleware::{AuthMiddleware, TokenRefreshMiddleware};
use crate::client::{build_http_client, retry_after, status_error, ApiResponse, RequestOptions};
use crate::config::TidalConfig;
use crate::error::{Result, TidalError};

/// Authenticated session against the TIDAL API.
pub struct Session {
    http: ClientWithMiddleware,
    keeper: Arc<TokenKeeper>,
    api_base: Url,
}

/// Snapshot for `auth status`.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub status: TokenStatus,
    pub client_id: String,
    pub user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn builder(config: &TidalConfig) -> SessionBuilder {
        SessionBuilder::new(config.clone())
    }

    /// Resume the session stored at `path`.
    ///
    /// The client ID is taken from the file when present, otherwise from
    /// `config`; the client secret always comes from `config`. Refreshes are
    /// persisted back to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if the file is missing, malformed or
    /// incomplete.
    pub fn load(path: &Path, config: &TidalConfig) -> Result<Self> {
        Self::builder(config).resume_from(path)?.build()
    }

    /// Write the current token pair to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::NotAuthenticated`] if there is nothing to save.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let tokens = self.token_pair().await.ok_or(TidalError::NotAuthenticated)?;
        FileSessionStore::new(path).save(&StoredSession {
            tokens,
            client_id: Some(self.keeper.credentials().id.clone()),
        })
    }

    /// Send an authenticated request to `endpoint`, relative to the API base.
    ///
    /// A leading `/` is ignored. The token is refreshed first if it is inside
    /// the refresh margin.
    ///
    /// # Errors
    ///
    /// - [`TidalError::NotAuthenticated`] / [`TidalError::TokenExpired`] without a usable token
    /// - [`TidalError::RateLimited`] on 429, [`TidalError::Api`] on any other non-2xx
    /// - [`TidalError::Timeout`] / [`TidalError::Transport`] on network failure
    /// - [`TidalError::Config`] if `endpoint` resolves outside the API base
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.endpoint_url(endpoint)?;
        tracing::debug!(%method, path = url.path(), "API request");

        let mut builder = self.http.request(method, url);
        if !options.params.is_empty() {
            builder = builder.query(&options.params);
        }
        if let Some(json) = &options.json {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(json)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response.bytes().await?;

        if !status.is_success() {
            tracing::debug!(%status, "API request failed");
            return Err(status_error(
                status,
                retry_after,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }

    /// GET `endpoint` and deserialize the body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.request(Method::GET, endpoint, options).await?.json()
    }

    /// Refresh the token pair now, regardless of expiry.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::NotAuthenticated`] without tokens, or
    /// [`TidalError::TokenExpired`] if the refresh token is rejected.
    pub async fn refresh(&self) -> Result<TokenPair> {
        self.keeper.refresh().await
    }

    /// Install a pair obtained from a fresh login.
    pub async fn authenticate(&self, tokens: TokenPair) {
        tracing::info!(user_id = ?tokens.user_id, "session authenticated");
        self.keeper.install(tokens).await;
    }

    pub async fn status(&self) -> SessionStatus {
        let status = self.keeper.status(Utc::now()).await;
        let tokens = self.token_pair().await;
        SessionStatus {
            status,
            client_id: self.keeper.credentials().id.clone(),
            user_id: tokens.as_ref().and_then(|t| t.user_id.clone()),
            expires_at: tokens.map(|t| t.expires_at),
        }
    }

    /// Current token pair, if authenticated.
    pub async fn token_pair(&self) -> Option<TokenPair> {
        match self.keeper.snapshot().await {
            TokenState::Authenticated(tokens) => Some(tokens),
            _ => None,
        }
    }

    /// Forget the tokens and delete the persisted session, if any.
    ///
    /// Returns `true` if a stored session was deleted.
    pub async fn logout(&self) -> Result<bool> {
        self.keeper.clear().await;
        match self.keeper.store() {
            Some(store) => store.delete(),
            None => Ok(false),
        }
    }

    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Resolve `endpoint` against the API base.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if the result leaves the API base, so the
    /// bearer token is never sent to another host.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let url = self.api_base.join(endpoint.trim_start_matches('/'))?;
        if url.origin() != self.api_base.origin() || !url.path().starts_with(self.api_base.path()) {
            return Err(TidalError::Config(format!(
                "Endpoint '{endpoint}' resolves outside the API base {}",
                self.api_base
            )));
        }
        Ok(url)
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    config: TidalConfig,
    credentials: Option<ClientCredentials>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    store: Option<Arc<dyn SessionStore>>,
    tokens: Option<TokenPair>,
}

impl SessionBuilder {
    fn new(config: TidalConfig) -> Self {
        Self {
            config,
            credentials: None,
            refresher: None,
            store: None,
            tokens: None,
        }
    }

    /// Start with this token pair.
    #[must_use]
    pub fn tokens(mut self, tokens: TokenPair) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Override the client credentials from configuration.
    #[must_use]
    pub fn credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use this refresher instead of an [`Authenticator`] built from configuration.
    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Persist logins and refreshes to the file at `path`.
    #[must_use]
    pub fn session_file(self, path: impl Into<PathBuf>) -> Self {
        self.store(Arc::new(FileSessionStore::new(path)))
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Load tokens and client ID from the session file at `path` and keep
    /// persisting there.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if the file cannot be used.
    pub fn resume_from(mut self, path: &Path) -> Result<Self> {
        let store = FileSessionStore::new(path);
        let stored = store.load()?;

        if self.credentials.is_none() {
            if let Some(id) = stored.client_id.or_else(|| self.config.client_id.clone()) {
                self.credentials = Some(ClientCredentials::new(
                    id,
                    self.config.client_secret.clone(),
                ));
            }
        }
        self.tokens = Some(stored.tokens);
        Ok(self.store(Arc::new(store)))
    }

    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if no client ID is available, or an
    /// error if the HTTP client cannot be built.
    pub fn build(self) -> Result<Session> {
        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => self.config.credentials()?,
        };

        let refresher = match self.refresher {
            Some(refresher) => refresher,
            None => {
                let mut config = self.config.clone();
                config.client_id = Some(credentials.id.clone());
                config.client_secret.clone_from(&credentials.secret);
                Arc::new(Authenticator::new(&config)?) as Arc<dyn TokenRefresher>
            }
        };

        let keeper = Arc::new(TokenKeeper::new(
            refresher,
            credentials,
            self.config.refresh_margin(),
            self.store,
            self.tokens,
        ));

        let http = ClientBuilder::new(build_http_client(self.config.request_timeout())?)
            .with(TokenRefreshMiddleware::new(Arc::clone(&keeper)))
            .with(AuthMiddleware::new(Arc::clone(&keeper)))
            .build();

        Ok(Session {
            http,
            keeper,
            api_base: self.config.api_base(),
        })
    }
}
