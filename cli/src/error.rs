//! Error types and result aliases for tidal-bridge.
//!
//! This module provides the error taxonomy shared by the authenticator,
//! the session core and its collaborators:
//! - Distinct variants for each OAuth and API failure mode
//! - User-friendly error messages with recovery suggestions
//! - Helper methods for error classification
//! - Automatic conversion from common error types

use std::time::Duration;

use thiserror::Error;

/// Main error type for tidal-bridge operations.
///
/// Use [`requires_reauth`](Self::requires_reauth) and [`is_retriable`](Self::is_retriable)
/// to pick a handling strategy, and [`http_status`](Self::http_status) when a
/// collaborator needs to translate the kind into a transport-level response.
#[derive(Error, Debug)]
pub enum TidalError {
    /// No token pair is loaded. The session has never been authenticated.
    #[error("Not authenticated with TIDAL. Run 'tidal-bridge auth login' to authenticate.")]
    NotAuthenticated,

    /// The refresh token was rejected. The session can no longer authenticate.
    #[error("Your TIDAL session has expired and could not be refreshed ({0}). Run 'tidal-bridge auth login' to re-authenticate.")]
    TokenExpired(String),

    /// OAuth flow failed: bad credentials, invalid grant or a non-2xx auth response.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Device code or PKCE callback expired before the user completed login.
    #[error("Authorization timed out before it was completed. Run 'tidal-bridge auth login' again and finish within the time limit.")]
    AuthTimeout,

    /// User denied the authorization request.
    #[error(
        "Authorization was denied. If this was unintentional, run 'tidal-bridge auth login' to try again."
    )]
    AuthDenied,

    /// Authenticated request returned a non-success status code.
    #[error("TIDAL API request failed ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// Authenticated request returned 429.
    #[error("TIDAL API rate limit exceeded. Back off before retrying. Details: {body}")]
    RateLimited {
        /// Raw response body.
        body: String,
        /// Server-suggested wait, from the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Request timed out.
    #[error("Request timed out. TIDAL may be slow or unreachable. Try again later.")]
    Timeout,

    /// Network failure before a response was received.
    #[error("Network error: {0}. Check your internet connection.")]
    Transport(String),

    /// Missing or malformed configuration or persisted session.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON or TOML serialization/deserialization failed.
    #[error("Data serialization error: {0}. This may indicate corrupted data.")]
    Serialization(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TidalError {
    /// Checks if this error can be resolved by running an auth flow again.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::TokenExpired(_) | Self::AuthDenied | Self::AuthTimeout
        ) || matches!(self, Self::Api { status: 401, .. })
    }

    /// Checks if this error is transient and the operation might succeed on retry.
    ///
    /// The session core itself never retries; this is for collaborators that
    /// implement their own backoff.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Checks if this is an API-call failure. Rate limiting and transport
    /// failures of authenticated requests count as API errors.
    #[must_use]
    pub const fn is_api_error(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::RateLimited { .. } | Self::Transport(_) | Self::Timeout
        )
    }

    /// HTTP status carried by an API error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Checks if the API reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Maps the error kind to the status a request pipeline should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        if self.requires_reauth() {
            return 401;
        }
        match self {
            Self::Api { status: 403, .. } => 403,
            Self::Api { status: 404, .. } => 404,
            Self::RateLimited { .. } => 429,
            Self::Timeout => 408,
            Self::Api { .. } | Self::Transport(_) | Self::Auth(_) => 502,
            _ => 500,
        }
    }
}

/// Result type alias using [`TidalError`].
pub type Result<T> = std::result::Result<T, TidalError>;

impl From<serde_json::Error> for TidalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for TidalError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML parse error: {err}"))
    }
}

impl From<toml::ser::Error> for TidalError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(format!("TOML serialize error: {err}"))
    }
}

impl From<reqwest::Error> for TidalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for TidalError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            // Middleware stages carry our own errors through anyhow.
            reqwest_middleware::Error::Middleware(e) => match e.downcast::<Self>() {
                Ok(tidal) => tidal,
                Err(other) => Self::Transport(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_friendly() {
        assert!(TidalError::NotAuthenticated
            .to_string()
            .contains("tidal-bridge auth login"));
        assert!(TidalError::TokenExpired("invalid_grant".to_string())
            .to_string()
            .contains("tidal-bridge auth login"));
        assert!(TidalError::AuthTimeout
            .to_string()
            .contains("tidal-bridge auth login"));
        assert!(TidalError::AuthDenied
            .to_string()
            .contains("tidal-bridge auth login"));
    }

    #[test]
    fn api_error_includes_status_and_body() {
        let err = TidalError::Api {
            status: 500,
            body: "internal server error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal server error"));
    }

    #[test]
    fn rate_limit_is_an_api_error() {
        let err = TidalError::RateLimited {
            body: String::new(),
            retry_after: None,
        };
        assert!(err.is_api_error());
        assert_eq!(err.status(), Some(429));
        assert!(TidalError::Transport("reset".to_string()).is_api_error());
        assert!(!TidalError::TokenExpired(String::new()).is_api_error());
    }

    #[test]
    fn requires_reauth_identifies_auth_errors() {
        assert!(TidalError::NotAuthenticated.requires_reauth());
        assert!(TidalError::TokenExpired(String::new()).requires_reauth());
        assert!(TidalError::AuthDenied.requires_reauth());
        assert!(TidalError::Api {
            status: 401,
            body: String::new()
        }
        .requires_reauth());

        assert!(!TidalError::Timeout.requires_reauth());
        assert!(!TidalError::Transport("test".to_string()).requires_reauth());
        assert!(!TidalError::Api {
            status: 404,
            body: String::new()
        }
        .requires_reauth());
    }

    #[test]
    fn is_retriable_identifies_transient_errors() {
        assert!(TidalError::Timeout.is_retriable());
        assert!(TidalError::Transport("test".to_string()).is_retriable());
        assert!(TidalError::Api {
            status: 503,
            body: String::new()
        }
        .is_retriable());

        assert!(!TidalError::NotAuthenticated.is_retriable());
        assert!(!TidalError::TokenExpired(String::new()).is_retriable());
        assert!(!TidalError::Auth("bad".to_string()).is_retriable());
    }

    #[test]
    fn http_status_maps_kinds() {
        assert_eq!(TidalError::NotAuthenticated.http_status(), 401);
        assert_eq!(TidalError::TokenExpired(String::new()).http_status(), 401);
        assert_eq!(
            TidalError::Api {
                status: 404,
                body: String::new()
            }
            .http_status(),
            404
        );
        assert_eq!(TidalError::Timeout.http_status(), 408);
        assert_eq!(TidalError::Config("x".to_string()).http_status(), 500);
        assert_eq!(
            TidalError::Api {
                status: 500,
                body: String::new()
            }
            .http_status(),
            502
        );
    }

    #[test]
    fn middleware_error_downcasts_back() {
        let wrapped = reqwest_middleware::Error::Middleware(anyhow::Error::new(
            TidalError::TokenExpired("revoked".to_string()),
        ));
        let err: TidalError = wrapped.into();
        assert!(matches!(err, TidalError::TokenExpired(ref r) if r == "revoked"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: TidalError = json_err.into();
        assert!(matches!(err, TidalError::Serialization(_)));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TidalError = io_err.into();
        assert!(matches!(err, TidalError::Io(_)));
    }

    #[test]
    fn from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: TidalError = url_err.into();
        assert!(matches!(err, TidalError::InvalidUrl(_)));
    }
}
