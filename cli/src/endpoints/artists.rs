//! Artist lookups.

use std::fmt;
use std::str::FromStr;

use crate::client::RequestOptions;
use crate::endpoints::id_segment;
use crate::endpoints::models::{Album, Artist, Page, TextBody, Track};
use crate::error::{Result, TidalError};
use crate::session::Session;

/// Release categories of an artist's discography.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlbumFilter {
    #[default]
    Albums,
    EpsAndSingles,
    Other,
}

impl AlbumFilter {
    /// Value expected by the `filter` query parameter.
    #[must_use]
    pub const fn api_value(self) -> &'static str {
        match self {
            Self::Albums => "ALBUMS",
            Self::EpsAndSingles => "EPSSINGLES",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for AlbumFilter {
    type Err = TidalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "albums" => Ok(Self::Albums),
            "ep_singles" => Ok(Self::EpsAndSingles),
            "other" => Ok(Self::Other),
            other => Err(TidalError::Config(format!(
                "Unknown album filter '{other}'. Use albums, ep_singles or other."
            ))),
        }
    }
}

impl fmt::Display for AlbumFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Albums => write!(f, "albums"),
            Self::EpsAndSingles => write!(f, "ep_singles"),
            Self::Other => write!(f, "other"),
        }
    }
}

pub struct ArtistsEndpoint<'a> {
    session: &'a Session,
}

impl<'a> ArtistsEndpoint<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn get(&self, artist_id: &str) -> Result<Artist> {
        self.session
            .get_json(&format!("artists/{}", id_segment(artist_id)?), RequestOptions::new())
            .await
    }

    pub async fn bio(&self, artist_id: &str) -> Result<Option<String>> {
        let body: TextBody = self
            .session
            .get_json(&format!("artists/{}/bio", id_segment(artist_id)?), RequestOptions::new())
            .await?;
        Ok(body.text)
    }

    pub async fn top_tracks(&self, artist_id: &str, limit: usize) -> Result<Vec<Track>> {
        self.items(
            &format!("artists/{}/toptracks", id_segment(artist_id)?),
            RequestOptions::new().param("limit", limit),
        )
        .await
    }

    pub async fn albums(
        &self,
        artist_id: &str,
        filter: AlbumFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Album>> {
        self.items(
            &format!("artists/{}/albums", id_segment(artist_id)?),
            RequestOptions::new()
                .param("filter", filter.api_value())
                .param("limit", limit)
                .param("offset", offset),
        )
        .await
    }

    pub async fn similar(&self, artist_id: &str) -> Result<Vec<Artist>> {
        self.items(&format!("artists/{}/similar", id_segment(artist_id)?), RequestOptions::new())
            .await
    }

    /// Radio tracks seeded by the artist. TIDAL caps these at 100.
    pub async fn radio(&self, artist_id: &str, limit: usize) -> Result<Vec<Track>> {
        self.items(
            &format!("artists/{}/radio", id_segment(artist_id)?),
            RequestOptions::new().param("limit", limit.min(100)),
        )
        .await
    }

    async fn items<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Vec<T>> {
        let page: Page<T> = self.session.get_json(endpoint, options).await?;
        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::endpoints::test_support::session_for;

    #[test]
    fn filter_maps_to_api_values() {
        assert_eq!("albums".parse::<AlbumFilter>().unwrap().api_value(), "ALBUMS");
        assert_eq!("ep_singles".parse::<AlbumFilter>().unwrap().api_value(), "EPSSINGLES");
        assert_eq!("other".parse::<AlbumFilter>().unwrap().api_value(), "OTHER");
        assert!("singles".parse::<AlbumFilter>().is_err());
    }

    #[tokio::test]
    async fn albums_send_filter() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/artists/8/albums"))
            .and(query_param("filter", "EPSSINGLES"))
            .and(query_param("limit", "10"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": 1, "title": "EP" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let albums = ArtistsEndpoint::new(&session)
            .albums("8", AlbumFilter::EpsAndSingles, 10, 0)
            .await
            .unwrap();

        assert_eq!(albums[0].title.as_deref(), Some("EP"));
    }

    #[tokio::test]
    async fn radio_limit_is_capped() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/artists/8/radio"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server);
        let radio = ArtistsEndpoint::new(&session).radio("8", 500).await.unwrap();

        assert!(radio.is_empty());
    }

    #[tokio::test]
    async fn bio_may_be_absent() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/artists/8/bio"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "source": "x" })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        assert_eq!(ArtistsEndpoint::new(&session).bio("8").await.unwrap(), None);
    }
}
