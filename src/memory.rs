//! In-memory catalog.
//!
//! Implements both collaborator traits over plain maps, with switches to
//! simulate missing, malformed and unreachable records. Used by the tests,
//! the benchmarks and anyone who wants to search a catalog file without
//! building a database first.

use crate::catalog::{CatalogFile, RelationshipExpander, SampleEdge, SongCatalog};
use crate::error::StoreError;
use crate::song::{Song, SongId};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Catalog held entirely in memory.
///
/// Neighbors follow the same rules as the SQLite store: the duplicate-release
/// group plus both directions of every sample edge touching it.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    songs: BTreeMap<SongId, Song>,
    samples: Vec<SampleEdge>,
    malformed: HashSet<SongId>,
    malformed_neighbors: HashSet<SongId>,
    unresolvable: HashSet<SongId>,
    unavailable: HashSet<SongId>,
    offline: bool,
    detail_loads: AtomicUsize,
    neighbor_loads: AtomicUsize,
}

impl MemoryCatalog {
    /// Empty catalog with no faults injected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every song and sample edge of an imported file.
    #[must_use]
    pub fn from_catalog(catalog: CatalogFile) -> Self {
        let mut memory = Self::new();
        for song in catalog.songs {
            memory.add_song(song);
        }
        memory.samples = catalog.samples;
        memory
    }

    /// Inserts or replaces a song.
    pub fn add_song(&mut self, song: Song) -> &mut Self {
        self.songs.insert(song.id, song);
        self
    }

    /// Records that `sampled_in` samples `original`.
    pub fn add_sample(&mut self, original: SongId, sampled_in: SongId) -> &mut Self {
        self.samples.push(SampleEdge { original, sampled_in });
        self
    }

    /// Detail loads for `id` will fail as malformed.
    pub fn mark_malformed(&mut self, id: SongId) -> &mut Self {
        self.malformed.insert(id);
        self
    }

    /// Neighbor loads for `id` will fail as malformed. Detail loads still
    /// succeed.
    pub fn mark_neighbors_malformed(&mut self, id: SongId) -> &mut Self {
        self.malformed_neighbors.insert(id);
        self
    }

    /// Seed lookups that would match `id` fail as malformed.
    pub fn mark_unresolvable(&mut self, id: SongId) -> &mut Self {
        self.unresolvable.insert(id);
        self
    }

    /// Detail loads for `id` will fail as a store outage.
    pub fn mark_unavailable(&mut self, id: SongId) -> &mut Self {
        self.unavailable.insert(id);
        self
    }

    /// Every call fails as a store outage while offline.
    pub fn set_offline(&mut self, offline: bool) -> &mut Self {
        self.offline = offline;
        self
    }

    /// Number of songs stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// True when no songs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Number of `load_song_detail` calls served so far.
    #[must_use]
    pub fn detail_loads(&self) -> usize {
        self.detail_loads.load(Ordering::Relaxed)
    }

    /// Number of `load_neighbors` calls served so far.
    #[must_use]
    pub fn neighbor_loads(&self) -> usize {
        self.neighbor_loads.load(Ordering::Relaxed)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("in-memory catalog is offline".into()));
        }
        Ok(())
    }
}

impl SongCatalog for MemoryCatalog {
    fn resolve_by_title_artist(&self, title: &str, artist: &str) -> Result<Vec<SongId>, StoreError> {
        self.ensure_online()?;
        let ids: Vec<SongId> = self
            .songs
            .values()
            .filter(|song| song.title == title && song.artists.iter().any(|a| a.name == artist))
            .map(|song| song.id)
            .collect();
        if let Some(id) = ids.iter().find(|id| self.unresolvable.contains(id)) {
            return Err(StoreError::Malformed {
                id: *id,
                reason: "unreadable credits".into(),
            });
        }
        Ok(ids)
    }

    fn load_song_detail(&self, id: SongId) -> Result<Song, StoreError> {
        self.detail_loads.fetch_add(1, Ordering::Relaxed);
        self.ensure_online()?;
        if self.unavailable.contains(&id) {
            return Err(StoreError::Unavailable(format!("song {id} is on an unreachable shard")));
        }
        if self.malformed.contains(&id) {
            return Err(StoreError::Malformed {
                id,
                reason: "corrupt record".into(),
            });
        }
        self.songs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }
}

impl RelationshipExpander for MemoryCatalog {
    fn load_neighbors(&self, id: SongId) -> Result<Vec<SongId>, StoreError> {
        self.neighbor_loads.fetch_add(1, Ordering::Relaxed);
        self.ensure_online()?;
        let song = self.songs.get(&id).ok_or(StoreError::NotFound(id))?;
        if self.malformed_neighbors.contains(&id) {
            return Err(StoreError::Malformed {
                id,
                reason: "corrupt sample links".into(),
            });
        }

        let group: BTreeSet<SongId> = self
            .songs
            .values()
            .filter(|other| other.title == song.title && other.release_year == song.release_year)
            .map(|other| other.id)
            .collect();

        let mut neighbors = group.clone();
        for edge in &self.samples {
            if group.contains(&edge.original) {
                neighbors.insert(edge.sampled_in);
            }
            if group.contains(&edge.sampled_in) {
                neighbors.insert(edge.original);
            }
        }
        neighbors.remove(&id);
        Ok(neighbors.into_iter().collect())
    }
}
