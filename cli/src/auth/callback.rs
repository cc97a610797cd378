//! Local HTTP listener that captures the PKCE redirect.
//!
//! Binds the redirect URI's port before the browser is opened, serves the
//! redirect path once, then shuts down.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use url::Url;

use crate::error::{Result, TidalError};

/// How long a finished listener may take to flush its last response.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Authorization code captured from the redirect.
///
/// Codes are single-use: exchanging one consumes it, and it cannot be cloned.
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode(***)")
    }
}

/// Query parameters of the OAuth redirect.
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Listener bound to the redirect URI, waiting for exactly one callback.
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Bind the host and port of `redirect_uri`.
    ///
    /// `localhost` binds the IPv4 loopback.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if the URI has no usable port, or
    /// [`TidalError::Auth`] if the port cannot be bound.
    pub async fn bind(redirect_uri: &Url) -> Result<Self> {
        let host = match redirect_uri.host_str() {
            None | Some("localhost") => "127.0.0.1",
            Some(host) => host,
        };
        let port = redirect_uri.port_or_known_default().ok_or_else(|| {
            TidalError::Config(format!("Redirect URI {redirect_uri} has no port"))
        })?;

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            TidalError::Auth(format!(
                "Cannot listen for the OAuth callback on {host}:{port}: {e}"
            ))
        })?;

        let path = match redirect_uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self { listener, path })
    }

    /// Address actually bound (useful when the redirect URI used port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the redirect and return its authorization code.
    ///
    /// # Errors
    ///
    /// - [`TidalError::Auth`] if `state` does not match `expected_state`, the
    ///   redirect carries an OAuth error, or no code is present
    /// - [`TidalError::AuthDenied`] if the user refused access
    /// - [`TidalError::AuthTimeout`] if nothing arrives within `timeout`
    pub async fn wait(self, expected_state: &str, timeout: Duration) -> Result<AuthorizationCode> {
        let Self { listener, path } = self;
        let (tx, rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new()
            .route(&path, get(handle_callback))
            .with_state(sender);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::debug!(%path, "waiting for OAuth callback");
        let outcome = tokio::time::timeout(timeout, rx).await;

        let _ = shutdown_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
        }

        match outcome {
            Err(_) => Err(TidalError::AuthTimeout),
            Ok(Err(_)) => Err(TidalError::Auth(
                "OAuth callback listener stopped unexpectedly".to_string(),
            )),
            Ok(Ok(params)) => authorization_code(params, expected_state),
        }
    }
}

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    Html(CALLBACK_PAGE)
}

fn authorization_code(params: CallbackParams, expected_state: &str) -> Result<AuthorizationCode> {
    if let Some(error) = params.error {
        if error == "access_denied" {
            return Err(TidalError::AuthDenied);
        }
        let detail = params
            .error_description
            .map(|d| format!(": {d}"))
            .unwrap_or_default();
        return Err(TidalError::Auth(format!("Authorization failed ({error}){detail}")));
    }

    if params.state.as_deref() != Some(expected_state) {
        tracing::warn!("OAuth callback state mismatch, discarding authorization code");
        return Err(TidalError::Auth(
            "OAuth state mismatch. The callback did not originate from this login attempt."
                .to_string(),
        ));
    }

    params
        .code
        .filter(|c| !c.is_empty())
        .map(AuthorizationCode)
        .ok_or_else(|| TidalError::Auth("OAuth callback is missing the authorization code".into()))
}

#[cfg(test)]
impl AuthorizationCode {
    pub(crate) fn for_test(code: &str) -> Self {
        Self(code.to_string())
    }
}

const CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>TIDAL login</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 4rem;">
    <h1>TIDAL login received</h1>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    async fn listener() -> (CallbackListener, SocketAddr) {
        let uri = Url::parse("http://127.0.0.1:0/api/auth/callback").unwrap();
        let listener = CallbackListener::bind(&uri).await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    fn redirect(addr: SocketAddr, query: &str) -> tokio::task::JoinHandle<()> {
        let url = format!("http://{addr}/api/auth/callback?{query}");
        tokio::spawn(async move {
            let _ = reqwest::get(url).await;
        })
    }

    #[tokio::test]
    async fn captures_code_with_matching_state() {
        let (listener, addr) = listener().await;
        let browser = redirect(addr, "code=abc123&state=expected");

        let code = listener
            .wait("expected", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(code.secret(), "abc123");
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_state_is_rejected() {
        let (listener, addr) = listener().await;
        let browser = redirect(addr, "code=abc123&state=forged");

        let err = listener
            .wait("expected", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, TidalError::Auth(ref m) if m.contains("state mismatch")));
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn denied_redirect_is_reported() {
        let (listener, addr) = listener().await;
        let browser = redirect(addr, "error=access_denied&state=expected");

        let err = listener
            .wait("expected", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, TidalError::AuthDenied));
        browser.await.unwrap();
    }

    #[tokio::test]
    async fn no_callback_times_out() {
        let (listener, _) = listener().await;

        let err = listener
            .wait("expected", Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, TidalError::AuthTimeout));
    }

    #[test]
    fn missing_code_is_rejected() {
        let params = CallbackParams {
            state: Some("s".into()),
            ..CallbackParams::default()
        };
        assert!(authorization_code(params, "s").is_err());
    }

    #[test]
    fn debug_hides_code() {
        let code = AuthorizationCode::for_test("secret-code");
        assert!(!format!("{code:?}").contains("secret-code"));
    }
}
