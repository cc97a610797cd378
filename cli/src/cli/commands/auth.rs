//! Authentication command handlers.

use chrono::Utc;

use crate::auth::{open_browser, Authenticator, CallbackListener, LoginFlow, TokenPair};
use crate::config::{load_config, TidalConfig};
use crate::error::{Result, TidalError};
use crate::session::{FileSessionStore, Session, SessionStore, TokenStatus};

/// Handle the `tidal-bridge auth login` command.
pub async fn handle_login(flow: Option<LoginFlow>, no_browser: bool) -> Result<()> {
    let config = load_config()?;
    let flow = flow.unwrap_or_else(|| LoginFlow::select(&config));
    let authenticator = Authenticator::new(&config)?;

    println!("Logging in to TIDAL ({flow} flow)...");
    println!();

    let tokens = tokio::select! {
        result = run_flow(&authenticator, flow, no_browser) => result?,
        _ = tokio::signal::ctrl_c() => {
            return Err(TidalError::Auth("Login cancelled".to_string()));
        }
    };

    let path = config.session_path();
    let session = Session::builder(&config)
        .credentials(authenticator.credentials().clone())
        .build()?;
    session.authenticate(tokens).await;
    session.save(&path).await?;

    println!();
    match session.status().await.user_id {
        Some(user_id) => println!("Successfully logged in as user {user_id}!"),
        None => println!("Successfully logged in!"),
    }
    println!("Session saved to {}", path.display());

    Ok(())
}

async fn run_flow(
    authenticator: &Authenticator,
    flow: LoginFlow,
    no_browser: bool,
) -> Result<TokenPair> {
    match flow {
        LoginFlow::Device => device_login(authenticator, no_browser).await,
        LoginFlow::Pkce => pkce_login(authenticator, no_browser).await,
    }
}

async fn device_login(authenticator: &Authenticator, no_browser: bool) -> Result<TokenPair> {
    let challenge = authenticator.start_device_auth().await?;
    let url = challenge.browser_url();

    println!("To authenticate, please visit:");
    println!();
    println!("  {url}");
    println!();
    println!("And confirm code: {}", challenge.user_code);
    println!();

    announce_browser(&url, no_browser);

    println!(
        "Waiting for authorization (expires in {} minutes)...",
        challenge.expires_in().as_secs().div_ceil(60)
    );
    authenticator.complete_device_login(&challenge).await
}

async fn pkce_login(authenticator: &Authenticator, no_browser: bool) -> Result<TokenPair> {
    // Bind before the browser opens so the redirect cannot arrive early.
    let listener = CallbackListener::bind(authenticator.redirect_uri()).await?;
    let challenge = authenticator.start_pkce_auth()?;
    let url = challenge.verification_url.to_string();

    println!("To authenticate, please visit:");
    println!();
    println!("  {url}");
    println!();

    announce_browser(&url, no_browser);

    println!(
        "Waiting for the browser to return to {}...",
        authenticator.redirect_uri()
    );
    authenticator
        .complete_pkce_login(listener, &challenge, authenticator.callback_timeout())
        .await
}

fn announce_browser(url: &str, no_browser: bool) {
    if no_browser {
        return;
    }
    if open_browser(url) {
        println!("Browser opened automatically.");
    } else {
        println!("Could not open browser. Please visit the URL manually.");
    }
    println!();
}

/// Handle the `tidal-bridge auth logout` command.
pub async fn handle_logout() -> Result<()> {
    let config = load_config()?;
    let store = FileSessionStore::new(config.session_path());

    if store.delete()? {
        println!("Successfully logged out.");
    } else {
        println!("Not currently logged in.");
    }

    Ok(())
}

/// Handle the `tidal-bridge auth status` command.
pub async fn handle_status() -> Result<()> {
    let config = load_config()?;
    let Some(session) = try_load_session(&config)? else {
        println!("Not logged in");
        println!();
        println!("Run 'tidal-bridge auth login' to authenticate.");
        return Ok(());
    };

    let status = session.status().await;
    println!("Logged in");
    println!();
    println!("  User ID:    {}", status.user_id.as_deref().unwrap_or("unknown"));
    println!("  Client ID:  {}", status.client_id);
    println!("  API Server: {}", config.api_base());
    println!("  Session:    {}", config.session_path().display());
    if let Some(expires_at) = status.expires_at {
        let remaining = (expires_at - Utc::now()).num_minutes();
        println!("  Token:      {} (expires {expires_at}, {remaining} min)", status.status);
    }

    if status.status == TokenStatus::Expiring {
        println!();
        println!("  The access token will be refreshed on the next request.");
    }

    Ok(())
}

/// Handle the `tidal-bridge auth refresh` command.
pub async fn handle_refresh() -> Result<()> {
    let config = load_config()?;
    let session = try_load_session(&config)?.ok_or(TidalError::NotAuthenticated)?;

    let tokens = session.refresh().await?;
    println!("Access token refreshed. New expiry: {}", tokens.expires_at);

    Ok(())
}

/// Load the stored session, or `None` if there is none.
pub(crate) fn try_load_session(config: &TidalConfig) -> Result<Option<Session>> {
    let path = config.session_path();
    if !path.exists() {
        return Ok(None);
    }
    Session::load(&path, config).map(Some)
}
