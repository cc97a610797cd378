//! Authentication middleware for injecting Bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{Extensions, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{Error, Middleware, Next, Result};

use crate::client::middleware::BearerToken;
use crate::error::TidalError;
use crate::session::{TokenKeeper, TokenState};

/// Middleware that injects the Bearer token into requests.
pub struct AuthMiddleware {
    keeper: Arc<TokenKeeper>,
}

impl AuthMiddleware {
    #[must_use]
    pub fn new(keeper: Arc<TokenKeeper>) -> Self {
        Self { keeper }
    }

    async fn current_token(&self, extensions: &Extensions) -> Option<String> {
        if let Some(BearerToken(token)) = extensions.get::<BearerToken>() {
            return Some(token.clone());
        }
        match self.keeper.snapshot().await {
            TokenState::Authenticated(pair) => Some(pair.access_token),
            _ => None,
        }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if let Some(token) = self.current_token(extensions).await {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::middleware(TidalError::Auth(
                    "access token contains characters not allowed in a header".into(),
                ))
            })?;
            req.headers_mut().insert(AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}
