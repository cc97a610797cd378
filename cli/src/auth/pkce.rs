//! Authorization code flow with PKCE.

use std::time::Duration;

use chrono::Utc;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope, TokenUrl,
};
use url::Url;

use crate::auth::authenticator::{Authenticator, FormReply};
use crate::auth::callback::{AuthorizationCode, CallbackListener};
use crate::auth::tokens::{TokenPair, TokenResponse};
use crate::error::{Result, TidalError};

/// Browser login prepared by [`Authenticator::start_pkce_auth`].
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Login page to open in the browser.
    pub verification_url: Url,
    /// Verifier matching the S256 challenge embedded in the URL.
    pub code_verifier: String,
    /// CSRF nonce the redirect must echo back.
    pub state: String,
}

impl Authenticator {
    fn oauth_client(&self) -> Result<BasicClient> {
        let auth_url = AuthUrl::new(self.login_url.to_string())
            .map_err(|e| TidalError::Config(format!("Invalid login URL: {e}")))?;
        let token_url = TokenUrl::new(self.token_url.to_string())
            .map_err(|e| TidalError::Config(format!("Invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(self.redirect_uri.to_string())
            .map_err(|e| TidalError::Config(format!("Invalid redirect URI: {e}")))?;

        Ok(BasicClient::new(
            ClientId::new(self.credentials.id.clone()),
            None,
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url))
    }

    /// Generate a verifier, challenge and state, and build the login URL.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Config`] if a configured URL is rejected.
    pub fn start_pkce_auth(&self) -> Result<PkceChallenge> {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

        let (verification_url, state) = self
            .oauth_client()?
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(challenge)
            .add_extra_param("lang", "EN")
            .add_extra_param("restrict_signup", "true")
            .url();

        tracing::debug!(host = ?verification_url.host_str(), "prepared PKCE login URL");

        Ok(PkceChallenge {
            verification_url,
            code_verifier: verifier.secret().clone(),
            state: state.secret().clone(),
        })
    }

    /// Bind the redirect URI and wait for the browser to come back.
    ///
    /// Prefer binding a [`CallbackListener`] before opening the browser and
    /// calling [`complete_pkce_login`](Self::complete_pkce_login); this
    /// convenience form binds and waits in one step.
    pub async fn await_callback(
        &self,
        expected_state: &str,
        timeout: Duration,
    ) -> Result<AuthorizationCode> {
        CallbackListener::bind(&self.redirect_uri)
            .await?
            .wait(expected_state, timeout)
            .await
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The code is consumed. A failed exchange is not retried; start a new login.
    ///
    /// # Errors
    ///
    /// Returns [`TidalError::Auth`] if the token endpoint rejects the exchange.
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        code_verifier: &str,
    ) -> Result<TokenPair> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.secret().to_string()),
            ("redirect_uri", self.redirect_uri.to_string()),
            ("code_verifier", code_verifier.to_string()),
            ("scope", self.scope()),
        ];
        form.extend(self.credentials.form_fields());
        drop(code);

        let issued_at = Utc::now();
        let FormReply { status, body, .. } = self.post_form(&self.token_url, &form).await?;

        if !status.is_success() {
            return Err(TidalError::Auth(format!(
                "Token exchange failed ({}): {body}",
                status.as_u16()
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body)?;
        let pair = response.into_token_pair(issued_at, None)?;
        tracing::info!(user_id = ?pair.user_id, "PKCE login complete");
        Ok(pair)
    }

    /// Wait on an already-bound listener, then exchange the code.
    pub async fn complete_pkce_login(
        &self,
        listener: CallbackListener,
        challenge: &PkceChallenge,
        timeout: Duration,
    ) -> Result<TokenPair> {
        let code = listener.wait(&challenge.state, timeout).await?;
        self.exchange_code(code, &challenge.code_verifier).await
    }
}
