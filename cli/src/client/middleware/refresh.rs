//! Token refresh middleware for automatic token renewal.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response, StatusCode};
use reqwest_middleware::{Error, Middleware, Next, Result};

use crate::client::middleware::BearerToken;
use crate::session::TokenKeeper;

/// Middleware that makes sure a usable access token exists before dispatch.
///
/// Terminal and unauthenticated sessions fail here, before any bytes leave
/// the process.
pub struct TokenRefreshMiddleware {
    keeper: Arc<TokenKeeper>,
}

impl TokenRefreshMiddleware {
    #[must_use]
    pub fn new(keeper: Arc<TokenKeeper>) -> Self {
        Self { keeper }
    }
}

#[async_trait]
impl Middleware for TokenRefreshMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let token = self
            .keeper
            .fresh_access_token()
            .await
            .map_err(Error::middleware)?;
        extensions.insert(BearerToken(token));

        let response = next.run(req, extensions).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Received 401 Unauthorized - the access token may have been revoked");
        }

        Ok(response)
    }
}
