//! Personal mixes, served as `pages/*` layout documents.

use serde_json::Value;

use crate::client::RequestOptions;
use crate::endpoints::models::{Mix, PageDocument, Track, TrackItem};
use crate::error::Result;
use crate::session::Session;

pub struct MixesEndpoint<'a> {
    session: &'a Session,
}

impl<'a> MixesEndpoint<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Mixes in the user's collection.
    pub async fn user_mixes(&self) -> Result<Vec<Mix>> {
        let page: PageDocument = self
            .session
            .get_json("pages/my_collection_my_mixes", RequestOptions::new())
            .await?;

        let mixes = page
            .rows
            .iter()
            .flat_map(|row| &row.modules)
            .flat_map(|module| module.items())
            .filter(|item| item.get("id").is_some())
            .map(|item| serde_json::from_value(item.clone()))
            .collect::<std::result::Result<Vec<Mix>, _>>()?;

        Ok(mixes)
    }

    /// Tracks of one mix. The first row of the page is mix metadata; the
    /// first non-empty list after it holds the tracks.
    pub async fn mix_tracks(&self, mix_id: &str) -> Result<Vec<Track>> {
        let page: PageDocument = self
            .session
            .get_json(
                "pages/mix",
                RequestOptions::new()
                    .param("mixId", mix_id)
                    .param("deviceType", "BROWSER"),
            )
            .await?;

        let Some(items) = page
            .rows
            .iter()
            .skip(1)
            .flat_map(|row| &row.modules)
            .map(|module| module.items())
            .find(|items| !items.is_empty())
        else {
            return Ok(Vec::new());
        };

        items.iter().map(track_from_item).collect()
    }
}

fn track_from_item(item: &Value) -> Result<Track> {
    let item: TrackItem = serde_json::from_value(item.clone())?;
    Ok(item.into_track())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::endpoints::test_support::session_for;

    #[tokio::test]
    async fn user_mixes_walk_rows_and_modules() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/pages/my_collection_my_mixes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [
                    { "modules": [
                        { "pagedList": { "items": [
                            { "id": "m1", "title": "My Mix 1" },
                            { "title": "no id" }
                        ] } },
                        { "pagedList": null }
                    ] },
                    { "modules": [
                        { "pagedList": { "items": [{ "id": "m2", "mixType": "DAILY_MIX" }] } }
                    ] }
                ]
            })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let mixes = MixesEndpoint::new(&session).user_mixes().await.unwrap();

        let ids: Vec<_> = mixes.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }

    #[tokio::test]
    async fn mix_tracks_skip_metadata_row() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/pages/mix"))
            .and(query_param("mixId", "m1"))
            .and(query_param("deviceType", "BROWSER"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [
                    { "modules": [{ "pagedList": { "items": [{ "id": "header" }] } }] },
                    { "modules": [{ "pagedList": { "items": [] } }] },
                    { "modules": [{ "pagedList": { "items": [{ "id": 10 }, { "id": 11 }] } }] }
                ]
            })))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let tracks = MixesEndpoint::new(&session).mix_tracks("m1").await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "10");
    }

    #[tokio::test]
    async fn unknown_mix_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/v1/pages/mix"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let session = session_for(&server);
        let err = MixesEndpoint::new(&session).mix_tracks("nope").await.unwrap_err();

        assert!(err.is_not_found());
    }
}
