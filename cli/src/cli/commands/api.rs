//! API command handlers. Output is JSON on stdout.

use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cli::commands::auth::try_load_session;
use crate::client::RequestOptions;
use crate::config::load_config;
use crate::endpoints::{bound_limit, pagination::MAX_LIMIT, AlbumFilter};
use crate::error::{Result, TidalError};
use crate::session::Session;

fn load_session() -> Result<Session> {
    let config = load_config()?;
    try_load_session(&config)?.ok_or(TidalError::NotAuthenticated)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle `tidal-bridge get <path>`.
pub async fn handle_get(path: &str, query: Vec<(String, String)>) -> Result<()> {
    let session = load_session()?;
    let options = RequestOptions {
        params: query,
        json: None,
    };

    let response = session.request(Method::GET, path, options).await?;
    print_json(&response.json_value()?)
}

/// Handle `tidal-bridge track <id>`.
pub async fn handle_track(id: &str, lyrics: bool, recommendations: Option<usize>) -> Result<()> {
    let session = load_session()?;
    let tracks = session.tracks();

    let mut out = Map::new();
    out.insert("track".into(), serde_json::to_value(tracks.get(id).await?)?);
    if lyrics {
        out.insert("lyrics".into(), serde_json::to_value(tracks.lyrics(id).await?)?);
    }
    if let Some(limit) = recommendations {
        let recommended = tracks.recommendations(id, bound_limit(limit, 100)).await?;
        out.insert("recommendations".into(), serde_json::to_value(recommended)?);
    }

    print_json(&out)
}

/// Handle `tidal-bridge album <id>`.
pub async fn handle_album(id: &str, track_limit: Option<usize>, review: bool) -> Result<()> {
    let session = load_session()?;
    let albums = session.albums();

    let mut out = Map::new();
    out.insert("album".into(), serde_json::to_value(albums.get(id).await?)?);
    if let Some(limit) = track_limit {
        let tracks = albums.all_tracks(id, bound_limit(limit, MAX_LIMIT)).await?;
        out.insert("tracks".into(), serde_json::to_value(tracks)?);
    }
    if review {
        out.insert("review".into(), json!(albums.review(id).await?));
    }

    print_json(&out)
}

/// Handle `tidal-bridge artist <id>`.
pub async fn handle_artist(
    id: &str,
    top_tracks: Option<usize>,
    albums: Option<AlbumFilter>,
) -> Result<()> {
    let session = load_session()?;
    let artists = session.artists();

    let mut out = Map::new();
    out.insert("artist".into(), serde_json::to_value(artists.get(id).await?)?);
    if let Some(limit) = top_tracks {
        let tracks = artists.top_tracks(id, bound_limit(limit, 100)).await?;
        out.insert("topTracks".into(), serde_json::to_value(tracks)?);
    }
    if let Some(filter) = albums {
        let releases = artists.albums(id, filter, 50, 0).await?;
        out.insert(filter.to_string(), serde_json::to_value(releases)?);
    }

    print_json(&out)
}

/// Handle `tidal-bridge mixes`.
pub async fn handle_mixes(mix_id: Option<&str>) -> Result<()> {
    let session = load_session()?;
    let mixes = session.mixes();

    let out: Value = match mix_id {
        Some(mix_id) => json!({ "mixId": mix_id, "tracks": mixes.mix_tracks(mix_id).await? }),
        None => json!({ "mixes": mixes.user_mixes().await? }),
    };

    print_json(&out)
}
