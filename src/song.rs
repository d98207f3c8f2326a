//! Catalog entities as the search engine sees them.
//!
//! Everything here is a read-only snapshot fetched per search call. Nothing
//! is cached between calls.

use serde::{Deserialize, Serialize};

/// Opaque catalog identifier. Distinct re-releases of the same song may
/// carry distinct ids.
pub type SongId = i64;

/// A credited performer on a song.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    pub name: String,
    /// At most one artist per song is expected to carry this flag.
    pub is_main: bool,
}

/// A musical recording with its credits and genre tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub title: String,
    /// Credited performers, main artist first when the store orders them.
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Free-text genre tags. Compared with [`crate::genre::has_genre`].
    #[serde(default)]
    pub genres: Vec<String>,
    /// Used by the store to group duplicate recordings.
    #[serde(default)]
    pub release_year: Option<i32>,
}

impl Song {
    /// Name of the first artist flagged as main, if any.
    #[must_use]
    pub fn main_artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .find(|artist| artist.is_main)
            .map(|artist| artist.name.as_str())
    }
}

/// Seed lookup key. Both fields are matched exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongQuery {
    pub title: String,
    pub artist: String,
}

impl SongQuery {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl std::fmt::Display for SongQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// One (seed, matched song) pair discovered by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub source_song: Song,
    pub matched_song: Song,
    /// Hops from `source_song` to `matched_song`. Zero when the seed matched.
    pub distance: usize,
    /// `source_song ..= matched_song`, always `distance + 1` long.
    pub path: Vec<Song>,
}

/// Traversal identity of a song: `title-mainArtist`.
///
/// Two catalog rows with the same key are the same node for visitation
/// purposes. The title is taken verbatim (no case folding). A song with no
/// main artist contributes an empty artist component, so two artist-less
/// songs with the same title collapse into one node.
#[must_use]
pub fn identity_key(song: &Song) -> String {
    format!("{}-{}", song.title, song.main_artist().unwrap_or(""))
}
