//! Album lookups.

use crate::client::RequestOptions;
use crate::endpoints::id_segment;
use crate::endpoints::models::{Album, Page, TextBody, Track};
use crate::endpoints::pagination::{fetch_all_paginated, DEFAULT_PAGE_SIZE};
use crate::error::Result;
use crate::session::Session;

pub struct AlbumsEndpoint<'a> {
    session: &'a Session,
}

impl<'a> AlbumsEndpoint<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn get(&self, album_id: &str) -> Result<Album> {
        self.session
            .get_json(&format!("albums/{}", id_segment(album_id)?), RequestOptions::new())
            .await
    }

    /// One page of an album's tracks.
    pub async fn tracks(&self, album_id: &str, limit: usize, offset: usize) -> Result<Vec<Track>> {
        let page: Page<Track> = self
            .session
            .get_json(
                &format!("albums/{}/tracks", id_segment(album_id)?),
                RequestOptions::new()
                    .param("limit", limit)
                    .param("offset", offset),
            )
            .await?;
        Ok(page.items)
    }

    /// Up to `limit` tracks, fetched page by page.
    pub async fn all_tracks(&self, album_id: &str, limit: usize) -> Result<Vec<Track>> {
        fetch_all_paginated(limit, DEFAULT_PAGE_SIZE, |limit, offset| {
            self.tracks(album_id, limit, offset)
        })
        .await
    }

    pub async fn similar(&self, album_id: &str) -> Result<Vec<Album>> {
        let page: Page<Album> = self
            .session
            .get_json(&format!("albums/{}/similar", id_segment(album_id)?), RequestOptions::new())
            .await?;
        Ok(page.items)
    }

    /// Editorial review text, if TIDAL has one.
    pub async fn review(&self, album_id: &str) -> Result<Option<String>> {
        let body: TextBody = self
            .session
            .get_json(&format!("albums/{}/review", id_segment(album_id)?), RequestOptions::new())
            .await?;
        Ok(body.text)
    }
}
