//! Track lookups.

use crate::client::RequestOptions;
use crate::endpoints::id_segment;
use crate::endpoints::models::{Lyrics, Page, Track};
use crate::error::Result;
use crate::session::Session;

pub struct TracksEndpoint<'a> {
    session: &'a Session,
}

impl<'a> TracksEndpoint<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn get(&self, track_id: &str) -> Result<Track> {
        self.session
            .get_json(&format!("tracks/{}", id_segment(track_id)?), RequestOptions::new())
            .await
    }

    /// Lyrics for a track, or `None` when TIDAL has none.
    pub async fn lyrics(&self, track_id: &str) -> Result<Option<Lyrics>> {
        let lyrics: Lyrics = match self
            .session
            .get_json(&format!("tracks/{}/lyrics", id_segment(track_id)?), RequestOptions::new())
            .await
        {
            Ok(lyrics) => lyrics,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(lyrics.text.is_some().then_some(lyrics))
    }

    /// Tracks similar to `track_id`. Unknown tracks have no recommendations.
    pub async fn recommendations(&self, track_id: &str, limit: usize) -> Result<Vec<Track>> {
        let page: Page<Track> = match self
            .session
            .get_json(
                &format!("tracks/{}/recommendations", id_segment(track_id)?),
                RequestOptions::new().param("limit", limit),
            )
            .await
        {
            Ok(page) => page,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(page.items)
    }
}
