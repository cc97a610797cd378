//! tidal-bridge - authenticated TIDAL session core
//!
//! Obtains OAuth tokens through the device or PKCE flow, persists them and
//! sends API requests through a [`Session`] that refreshes tokens before
//! they expire. Tools share one session:
//!
//! ```no_run
//! # async fn demo() -> tidal_bridge::error::Result<()> {
//! use std::sync::Arc;
//!
//! use tidal_bridge::client::RequestOptions;
//! use tidal_bridge::config::load_config;
//! use tidal_bridge::session::Session;
//!
//! let config = load_config()?;
//! let session = Arc::new(Session::load(&config.session_path(), &config)?);
//! let track = session
//!     .request(reqwest::Method::GET, "/tracks/123", RequestOptions::new())
//!     .await?
//!     .json_value()?;
//! # let _ = track;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod session;

pub use error::{Result, TidalError};
pub use session::Session;
