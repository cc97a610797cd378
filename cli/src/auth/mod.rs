//! Authentication module for tidal-bridge.
//!
//! This module obtains and renews TIDAL OAuth tokens:
//! - [`device_flow`] - device authorization grant with interval-honoring polling
//! - [`pkce`] - browser login with PKCE and a local redirect listener
//! - [`refresh`] - the refresh grant and the [`TokenRefresher`] seam used by sessions

pub mod authenticator;
pub mod callback;
pub mod credentials;
pub mod device_flow;
pub mod pkce;
pub mod refresh;
pub mod tokens;

pub use authenticator::Authenticator;
pub use callback::{AuthorizationCode, CallbackListener};
pub use credentials::ClientCredentials;
pub use device_flow::DeviceAuthChallenge;
pub use pkce::PkceChallenge;
pub use refresh::TokenRefresher;
pub use tokens::TokenPair;

use crate::config::TidalConfig;

/// Open `url` in the default browser. Returns `false` if no browser could be launched.
pub fn open_browser(url: &str) -> bool {
    tracing::debug!(url, "opening browser");
    open::that(url).is_ok()
}

/// Which OAuth flow an interactive login should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFlow {
    /// Device authorization: the user enters a code on a second screen.
    Device,
    /// Authorization code with PKCE and a local redirect.
    Pkce,
}

impl LoginFlow {
    /// PKCE when custom developer credentials are configured, device flow otherwise.
    #[must_use]
    pub const fn select(config: &TidalConfig) -> Self {
        if config.uses_custom_credentials() {
            Self::Pkce
        } else {
            Self::Device
        }
    }
}

impl std::fmt::Display for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Pkce => write!(f, "pkce"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_prefers_pkce_with_custom_credentials() {
        let mut config = TidalConfig::default();
        assert_eq!(LoginFlow::select(&config), LoginFlow::Device);

        config.client_secret = Some("secret".into());
        assert_eq!(LoginFlow::select(&config), LoginFlow::Pkce);
    }
}
