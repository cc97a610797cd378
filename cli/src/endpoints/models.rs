//! Response models for TIDAL catalog endpoints.
//!
//! Every field is optional: different endpoints return different subsets of
//! the same entity. Fields without a typed counterpart are kept in `extra`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<ArtistRef>,
    pub artists: Option<Vec<ArtistRef>>,
    pub album: Option<AlbumRef>,
    /// Seconds.
    pub duration: Option<u64>,
    pub track_number: Option<u32>,
    pub volume_number: Option<u32>,
    pub explicit: Option<bool>,
    pub isrc: Option<String>,
    pub popularity: Option<u32>,
    pub audio_quality: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Album {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<ArtistRef>,
    pub artists: Option<Vec<ArtistRef>>,
    /// Cover image UUID.
    pub cover: Option<String>,
    pub release_date: Option<String>,
    pub number_of_tracks: Option<u32>,
    pub duration: Option<u64>,
    pub explicit: Option<bool>,
    pub popularity: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artist {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: Option<String>,
    /// Picture UUID.
    pub picture: Option<String>,
    pub url: Option<String>,
    pub popularity: Option<u32>,
    pub roles: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mix {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: Option<String>,
    pub sub_title: Option<String>,
    pub short_subtitle: Option<String>,
    pub mix_type: Option<String>,
    pub images: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lyrics {
    pub text: Option<String>,
    /// Time-synced lyrics in LRC format.
    pub subtitles: Option<String>,
    pub provider: Option<String>,
}

/// Artist as embedded in tracks and albums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistRef {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Album as embedded in tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumRef {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: Option<String>,
    pub cover: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_number_of_items: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Body of the bio and review endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TextBody {
    pub text: Option<String>,
}

/// A list entry that is either the track itself or wraps it as `{"item": …}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TrackItem {
    Wrapped { item: Track },
    Bare(Track),
}

impl TrackItem {
    #[must_use]
    pub fn into_track(self) -> Track {
        match self {
            Self::Wrapped { item } | Self::Bare(item) => item,
        }
    }
}

/// Layout document returned by the `pages/*` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageDocument {
    pub rows: Vec<PageRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageRow {
    pub modules: Vec<PageModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct PageModule {
    pub paged_list: Option<PagedList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PagedList {
    pub items: Vec<Value>,
}

impl PageModule {
    pub(crate) fn items(&self) -> &[Value] {
        self.paged_list
            .as_ref()
            .map(|list| list.items.as_slice())
            .unwrap_or(&[])
    }
}

/// TIDAL ids are numeric for most entities and strings for mixes.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
