//! Shared token state and the single-flight refresh gate.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::auth::{ClientCredentials, TokenPair, TokenRefresher};
use crate::error::{Result, TidalError};
use crate::session::storage::{SessionStore, StoredSession};

/// Where a session is in its token lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Authenticated(TokenPair),
    /// The refresh token was rejected. Only a new login leaves this state.
    Revoked(String),
}

/// Token state summarized for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Unauthenticated,
    /// Access token is usable as-is.
    Valid,
    /// Access token is inside the refresh margin; the next request refreshes it.
    Expiring,
    Revoked,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Valid => write!(f, "valid"),
            Self::Expiring => write!(f, "expiring"),
            Self::Revoked => write!(f, "expired (refresh rejected)"),
        }
    }
}

/// Owns the token state of one session.
///
/// Reads go through an async `RwLock`. Refreshes are serialized by a
/// separate gate so concurrent requests on a stale token trigger one refresh.
pub struct TokenKeeper {
    state: RwLock<TokenState>,
    refresh_gate: Mutex<()>,
    refresher: Arc<dyn TokenRefresher>,
    credentials: ClientCredentials,
    margin: Duration,
    store: Option<Arc<dyn SessionStore>>,
}

impl TokenKeeper {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        credentials: ClientCredentials,
        margin: Duration,
        store: Option<Arc<dyn SessionStore>>,
        tokens: Option<TokenPair>,
    ) -> Self {
        let state = tokens.map_or(TokenState::Unauthenticated, TokenState::Authenticated);
        Self {
            state: RwLock::new(state),
            refresh_gate: Mutex::new(()),
            refresher,
            credentials,
            margin,
            store,
        }
    }

    #[must_use]
    pub const fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    pub(crate) fn store(&self) -> Option<&Arc<dyn SessionStore>> {
        self.store.as_ref()
    }

    pub async fn snapshot(&self) -> TokenState {
        self.state.read().await.clone()
    }

    pub async fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        match &*self.state.read().await {
            TokenState::Unauthenticated => TokenStatus::Unauthenticated,
            TokenState::Revoked(_) => TokenStatus::Revoked,
            TokenState::Authenticated(pair) if pair.needs_refresh(now, self.margin) => {
                TokenStatus::Expiring
            }
            TokenState::Authenticated(_) => TokenStatus::Valid,
        }
    }

    /// Install a pair from a fresh login, leaving any terminal state.
    pub async fn install(&self, tokens: TokenPair) {
        let _gate = self.refresh_gate.lock().await;
        self.persist(&tokens).await;
        *self.state.write().await = TokenState::Authenticated(tokens);
    }

    /// Drop the tokens held in memory.
    pub async fn clear(&self) {
        let _gate = self.refresh_gate.lock().await;
        *self.state.write().await = TokenState::Unauthenticated;
    }

    /// Access token to send right now, refreshing first if it is stale.
    ///
    /// # Errors
    ///
    /// - [`TidalError::NotAuthenticated`] without a token pair
    /// - [`TidalError::TokenExpired`] once a refresh has been rejected
    /// - whatever the refresher returns if a needed refresh fails
    pub async fn fresh_access_token(&self) -> Result<String> {
        let observed = {
            let state = self.state.read().await;
            match &*state {
                TokenState::Unauthenticated => return Err(TidalError::NotAuthenticated),
                TokenState::Revoked(reason) => return Err(TidalError::TokenExpired(reason.clone())),
                TokenState::Authenticated(pair) if !pair.needs_refresh(Utc::now(), self.margin) => {
                    return Ok(pair.access_token.clone());
                }
                TokenState::Authenticated(pair) => pair.access_token.clone(),
            }
        };

        tracing::debug!("access token is stale, refreshing before request");
        let pair = self.refresh_from(Some(&observed)).await?;
        Ok(pair.access_token)
    }

    /// Refresh unconditionally.
    pub async fn refresh(&self) -> Result<TokenPair> {
        self.refresh_from(None).await
    }

    /// Run the refresh grant under the gate.
    ///
    /// With `observed` set, a caller that waited on the gate while another
    /// caller replaced `observed` reuses the replacement instead of refreshing
    /// again.
    async fn refresh_from(&self, observed: Option<&str>) -> Result<TokenPair> {
        let _gate = self.refresh_gate.lock().await;

        let current = {
            let state = self.state.read().await;
            match &*state {
                TokenState::Unauthenticated => return Err(TidalError::NotAuthenticated),
                TokenState::Revoked(reason) => return Err(TidalError::TokenExpired(reason.clone())),
                TokenState::Authenticated(pair) => pair.clone(),
            }
        };

        if let Some(observed) = observed {
            if current.access_token != observed && !current.needs_refresh(Utc::now(), self.margin) {
                tracing::debug!("token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        match self
            .refresher
            .refresh(&self.credentials, &current.refresh_token)
            .await
        {
            Ok(tokens) => {
                tracing::info!(expires_at = %tokens.expires_at, "access token refreshed");
                self.persist(&tokens).await;
                *self.state.write().await = TokenState::Authenticated(tokens.clone());
                Ok(tokens)
            }
            Err(TidalError::TokenExpired(reason)) => {
                tracing::warn!(%reason, "refresh token rejected, session needs a new login");
                *self.state.write().await = TokenState::Revoked(reason.clone());
                Err(TidalError::TokenExpired(reason))
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, keeping current tokens");
                Err(e)
            }
        }
    }

    /// Write `tokens` to the store, if any. Failures are logged, not returned:
    /// the in-memory pair stays authoritative for this process.
    ///
    /// The write runs on the blocking pool; the gate stays held until it lands
    /// so saves never reorder.
    async fn persist(&self, tokens: &TokenPair) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let stored = StoredSession {
            tokens: tokens.clone(),
            client_id: Some(self.credentials.id.clone()),
        };
        match tokio::task::spawn_blocking(move || store.save(&stored)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to persist session"),
            Err(e) => tracing::warn!(error = %e, "session persist task failed"),
        }
    }
}
