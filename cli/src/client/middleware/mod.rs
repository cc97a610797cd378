//! HTTP client middleware.
//!
//! Stages run in registration order: [`TokenRefreshMiddleware`] first, so
//! [`AuthMiddleware`] always sees the token the refresh stage settled on.

pub mod auth;
pub mod refresh;

pub use auth::AuthMiddleware;
pub use refresh::TokenRefreshMiddleware;

/// Access token chosen for one request, handed from the refresh stage to the
/// auth stage through request extensions.
#[derive(Clone)]
pub(crate) struct BearerToken(pub(crate) String);
