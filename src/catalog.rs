//! Collaborator interfaces consumed by the search engine.
//!
//! Both traits are synchronous and blocking. Implementations report a missing
//! id as [`StoreError::NotFound`] and an unreachable store as
//! [`StoreError::Unavailable`]; the engine relies on that split.

use crate::error::StoreError;
use crate::song::{Song, SongId};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Resolves seeds and loads song details.
pub trait SongCatalog: Send + Sync {
    /// Ids of every song whose title equals `title` and that credits an
    /// artist named `artist`. An empty list is not an error.
    fn resolve_by_title_artist(&self, title: &str, artist: &str) -> Result<Vec<SongId>, StoreError>;

    /// Full detail (title, credits with main flag, genres) for `id`.
    fn load_song_detail(&self, id: SongId) -> Result<Song, StoreError>;
}

/// Expands a song into its one-hop neighborhood.
pub trait RelationshipExpander: Send + Sync {
    /// Members of the song's duplicate-recording group (same title and
    /// release year) plus every song that samples, or is sampled by, any
    /// group member. Deduplicated, never containing `id` itself.
    fn load_neighbors(&self, id: SongId) -> Result<Vec<SongId>, StoreError>;
}

impl<T: SongCatalog + ?Sized> SongCatalog for &T {
    fn resolve_by_title_artist(&self, title: &str, artist: &str) -> Result<Vec<SongId>, StoreError> {
        (**self).resolve_by_title_artist(title, artist)
    }

    fn load_song_detail(&self, id: SongId) -> Result<Song, StoreError> {
        (**self).load_song_detail(id)
    }
}

impl<T: RelationshipExpander + ?Sized> RelationshipExpander for &T {
    fn load_neighbors(&self, id: SongId) -> Result<Vec<SongId>, StoreError> {
        (**self).load_neighbors(id)
    }
}

/// On-disk catalog interchange format, used to seed either store.
///
/// ```json
/// {
///   "songs": [{"id": 1, "title": "Amen, Brother", "releaseYear": 1969,
///              "artists": [{"id": 7, "name": "The Winstons", "isMain": true}],
///              "genres": ["Soul"]}],
///   "samples": [{"original": 1, "sampledIn": 2}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub songs: Vec<Song>,
    #[serde(default)]
    pub samples: Vec<SampleEdge>,
}

/// `sampled_in` contains audio taken from `original`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleEdge {
    pub original: SongId,
    pub sampled_in: SongId,
}

impl CatalogFile {
    /// Reads and parses a JSON catalog.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid catalog.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid catalog JSON in {}", path.display()))
    }
}
