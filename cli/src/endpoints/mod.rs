//! Typed TIDAL catalog endpoints.
//!
//! Thin wrappers over [`Session::request`](crate::session::Session::request);
//! each borrows the session for the duration of its calls.

pub mod albums;
pub mod artists;
pub mod mixes;
pub mod models;
pub mod pagination;
pub mod tracks;

pub use albums::AlbumsEndpoint;
pub use artists::{AlbumFilter, ArtistsEndpoint};
pub use mixes::MixesEndpoint;
pub use models::{Album, Artist, Lyrics, Mix, Page, Track};
pub use pagination::{bound_limit, fetch_all_paginated};
pub use tracks::TracksEndpoint;

use url::Url;

use crate::error::{Result, TidalError};
use crate::session::Session;

/// Percent-encode a caller-supplied id as one path segment.
///
/// `/`, `?`, `#` and `%` are escaped so an id cannot add path segments or a
/// query string. Empty and dot-segment ids are rejected.
pub(crate) fn id_segment(id: &str) -> Result<String> {
    if matches!(id, "" | "." | "..") {
        return Err(TidalError::Config(format!("invalid resource id: {id:?}")));
    }
    let mut url = Url::parse("http://segment.invalid/")?;
    url.path_segments_mut()
        .map_err(|()| TidalError::Config("cannot encode resource id".into()))?
        .pop_if_empty()
        .push(id);
    Ok(url.path().trim_start_matches('/').to_string())
}

impl Session {
    #[must_use]
    pub const fn tracks(&self) -> TracksEndpoint<'_> {
        TracksEndpoint::new(self)
    }

    #[must_use]
    pub const fn albums(&self) -> AlbumsEndpoint<'_> {
        AlbumsEndpoint::new(self)
    }

    #[must_use]
    pub const fn artists(&self) -> ArtistsEndpoint<'_> {
        ArtistsEndpoint::new(self)
    }

    #[must_use]
    pub const fn mixes(&self) -> MixesEndpoint<'_> {
        MixesEndpoint::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_pass_through() {
        assert_eq!(id_segment("75413016").unwrap(), "75413016");
        assert_eq!(id_segment("000ec0b01da1ddd752ec5dee553d48").unwrap(), "000ec0b01da1ddd752ec5dee553d48");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(id_segment("1?foo=bar").unwrap(), "1%3Ffoo=bar");
        assert_eq!(id_segment("1/../admin").unwrap(), "1%2F..%2Fadmin");
        assert_eq!(id_segment("1#frag").unwrap(), "1%23frag");
        assert_eq!(id_segment("50%").unwrap(), "50%25");
    }

    #[test]
    fn empty_and_dot_ids_are_rejected() {
        for id in ["", ".", ".."] {
            assert!(matches!(id_segment(id), Err(TidalError::Config(_))), "{id:?}");
        }
    }
}
