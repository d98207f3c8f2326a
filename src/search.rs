//! Genre reachability search.
//!
//! Each seed gets its own breadth-first run over the implicit sampling graph:
//! resolve the seed to catalog ids, then expand layer by layer through
//! [`RelationshipExpander::load_neighbors`] until the depth bound is reached.
//! Songs are deduplicated by [`identity_key`], so cyclic sample chains and
//! duplicate releases never enqueue the same song twice for a seed.
//!
//! ## Failure policy
//!
//! - A seed that resolves to nothing contributes no results.
//! - A song that is missing or malformed is skipped (neither matched nor
//!   expanded) and the run carries on.
//! - A song whose neighbors cannot be read is still matched, just not expanded.
//! - A store outage, a cancellation or an expired deadline fails the whole
//!   call. No partial results are returned.
//!
//! ## Example
//!
//! ```
//! use samplehop::memory::MemoryCatalog;
//! use samplehop::search::SearchEngine;
//! use samplehop::song::{Artist, Song, SongQuery};
//!
//! let song = |id, title: &str, genre: &str| Song {
//!     id,
//!     title: title.to_string(),
//!     artists: vec![Artist { id, name: format!("Artist {id}"), is_main: true }],
//!     genres: vec![genre.to_string()],
//!     release_year: None,
//! };
//!
//! let mut catalog = MemoryCatalog::new();
//! catalog.add_song(song(1, "Seed", "Hip-Hop"));
//! catalog.add_song(song(2, "Break", "Funk"));
//! catalog.add_sample(2, 1);
//!
//! let engine = SearchEngine::new(&catalog, &catalog);
//! let results = engine.search(&[SongQuery::new("Seed", "Artist 1")], "funk", 2)?;
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].distance, 1);
//! # Ok::<(), samplehop::error::SearchError>(())
//! ```

use crate::catalog::{RelationshipExpander, SongCatalog};
use crate::error::{SearchError, StoreError};
use crate::genre;
use crate::song::{identity_key, SearchResult, Song, SongId, SongQuery};
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation for a search call.
///
/// Checked between frontier dequeues. Clones share the same flag, so a
/// caller can keep one clone and cancel from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SearchError::TimedOut),
            _ => Ok(()),
        }
    }
}

/// Search engine over a song catalog and its sampling relationships.
///
/// Holds no state between calls besides its collaborators.
#[derive(Debug, Clone)]
pub struct SearchEngine<C, R> {
    catalog: C,
    relations: R,
    workers: usize,
}

impl<C, R> SearchEngine<C, R>
where
    C: SongCatalog,
    R: RelationshipExpander,
{
    /// Sequential engine: seeds are searched one after another.
    pub fn new(catalog: C, relations: R) -> Self {
        Self {
            catalog,
            relations,
            workers: 0,
        }
    }

    /// Fan seeds out over a pool of `workers` threads. Zero keeps the
    /// search on the calling thread.
    ///
    /// Workers only overlap as far as the collaborators allow. A SQLite
    /// store needs one connection per worker, see
    /// [`crate::db::SqliteStore::open_pooled`].
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Finds every song tagged `target_genre` within `max_depth` hops of
    /// each seed. `max_depth` is taken literally; callers substitute their
    /// own default for non-positive input.
    ///
    /// Results for one seed are in non-decreasing distance order and seeds
    /// appear in input order. The same matched song is reported once per
    /// seed that reaches it.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Store`] if the catalog is unavailable.
    pub fn search(
        &self,
        seeds: &[SongQuery],
        target_genre: &str,
        max_depth: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.search_with_cancel(seeds, target_genre, max_depth, &CancelToken::new())
    }

    /// Same as [`SearchEngine::search`], aborting with
    /// [`SearchError::Cancelled`] or [`SearchError::TimedOut`] as soon as
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// Store outages, cancellation and deadline expiry.
    pub fn search_with_cancel(
        &self,
        seeds: &[SongQuery],
        target_genre: &str,
        max_depth: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchResult>, SearchError> {
        debug!(
            "Searching {} seed(s) for genre '{target_genre}' within {max_depth} hop(s)",
            seeds.len()
        );

        let per_seed = if self.workers == 0 || seeds.len() < 2 {
            seeds
                .iter()
                .map(|seed| self.search_seed(seed, target_genre, max_depth, cancel))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("samplehop-search-{i}"))
                .build()
                .map_err(|e| SearchError::WorkerPool(e.to_string()))?;

            // Seeds not yet started are skipped once any seed has failed. Their
            // empty results are discarded along with everything else.
            let failed = AtomicBool::new(false);
            pool.install(|| {
                seeds
                    .par_iter()
                    .map(|seed| {
                        if failed.load(Ordering::Relaxed) {
                            return Ok(Vec::new());
                        }
                        let outcome = self.search_seed(seed, target_genre, max_depth, cancel);
                        if outcome.is_err() {
                            failed.store(true, Ordering::Relaxed);
                        }
                        outcome
                    })
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?
        };

        Ok(per_seed.into_iter().flatten().collect())
    }

    /// One breadth-first run for a single seed query.
    fn search_seed(
        &self,
        seed: &SongQuery,
        target_genre: &str,
        max_depth: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let start_ids = match self.catalog.resolve_by_title_artist(&seed.title, &seed.artist) {
            Ok(ids) => ids,
            Err(err) if err.is_hard() => return Err(err.into()),
            Err(err) => {
                debug!("Skipping seed {seed}: {err}");
                return Ok(Vec::new());
            }
        };

        if start_ids.is_empty() {
            warn!("Seed {seed} matched no catalog songs");
            return Ok(Vec::new());
        }
        debug!("Seed {seed} resolved to {start_ids:?}");

        let mut run = SeedRun::default();
        for id in start_ids {
            if let Some(song) = self.load_song(id)? {
                run.visit(song, None, 0);
            }
        }

        while let Some(index) = run.frontier.pop_front() {
            if let Err(err) = cancel.check() {
                warn!("Abandoning seed {seed}: {err}");
                return Err(err);
            }

            let (song_id, distance) = {
                let node = &run.nodes[index];
                (node.song.id, node.distance)
            };
            trace!("Dequeued song {song_id} at distance {distance}");

            if distance > max_depth {
                continue;
            }

            if genre::has_genre(&run.nodes[index].song.genres, target_genre) {
                let result = run.result_for(index);
                run.results.push(result);
            }

            if distance == max_depth {
                continue;
            }

            let neighbors = match self.relations.load_neighbors(song_id) {
                Ok(neighbors) => neighbors,
                Err(err) if err.is_hard() => return Err(err.into()),
                Err(err) => {
                    debug!("Not expanding song {song_id}: {err}");
                    continue;
                }
            };

            for neighbor_id in neighbors {
                if let Some(neighbor) = self.load_song(neighbor_id)? {
                    run.visit(neighbor, Some(index), distance + 1);
                }
            }
        }

        debug!(
            "Seed {seed}: visited {} song(s), {} match(es)",
            run.nodes.len(),
            run.results.len()
        );
        Ok(run.results)
    }

    /// Loads a song, turning soft failures into `None`.
    fn load_song(&self, id: SongId) -> Result<Option<Song>, StoreError> {
        match self.catalog.load_song_detail(id) {
            Ok(song) => Ok(Some(song)),
            Err(err) if err.is_hard() => Err(err),
            Err(err) => {
                debug!("Skipping song {id}: {err}");
                Ok(None)
            }
        }
    }
}

/// A song reached during a run, linked to the node it was reached from.
#[derive(Debug)]
struct Node {
    song: Song,
    parent: Option<usize>,
    distance: usize,
}

/// Mutable state of one seed's run.
///
/// Nodes live in an arena and the frontier holds arena indices, so paths are
/// rebuilt from parent links only for songs that actually match.
#[derive(Debug, Default)]
struct SeedRun {
    nodes: Vec<Node>,
    frontier: VecDeque<usize>,
    visited: HashSet<String>,
    results: Vec<SearchResult>,
}

impl SeedRun {
    /// Enqueues `song` unless its identity was already claimed in this run.
    fn visit(&mut self, song: Song, parent: Option<usize>, distance: usize) {
        if !self.visited.insert(identity_key(&song)) {
            trace!("Song {} already visited", song.id);
            return;
        }
        self.nodes.push(Node {
            song,
            parent,
            distance,
        });
        self.frontier.push_back(self.nodes.len() - 1);
    }

    fn path_to(&self, index: usize) -> Vec<Song> {
        let mut path = Vec::with_capacity(self.nodes[index].distance + 1);
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            path.push(self.nodes[i].song.clone());
            cursor = self.nodes[i].parent;
        }
        path.reverse();
        path
    }

    fn result_for(&self, index: usize) -> SearchResult {
        let path = self.path_to(index);
        let node = &self.nodes[index];
        SearchResult {
            source_song: path[0].clone(),
            matched_song: node.song.clone(),
            distance: node.distance,
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use crate::song::Artist;

    fn song(id: SongId, title: &str, artist: &str, genres: &[&str]) -> Song {
        Song {
            id,
            title: title.to_string(),
            artists: vec![Artist {
                id: id * 100,
                name: artist.to_string(),
                is_main: true,
            }],
            genres: genres.iter().map(|g| (*g).to_string()).collect(),
            release_year: None,
        }
    }

    fn ids(path: &[Song]) -> Vec<SongId> {
        path.iter().map(|s| s.id).collect()
    }

    /// S0 samples S1 (jazz), S1 samples S2 (rock).
    fn chain() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        catalog.add_song(song(0, "Title A", "Artist X", &["Pop"]));
        catalog.add_song(song(1, "Title B", "Artist Y", &["Jazz"]));
        catalog.add_song(song(2, "Title C", "Artist Z", &["Rock"]));
        catalog.add_sample(1, 0);
        catalog.add_sample(2, 1);
        catalog
    }

    fn seed() -> Vec<SongQuery> {
        vec![SongQuery::new("Title A", "Artist X")]
    }

    #[test]
    fn test_unknown_seed_yields_nothing() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine
            .search(&[SongQuery::new("Nope", "Nobody")], "rock", 3)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_seed_list_yields_nothing() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        assert!(engine.search(&[], "rock", 3).unwrap().is_empty());
    }

    #[test]
    fn test_seed_itself_can_match() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine.search(&seed(), "pop", 3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].distance, 0);
        assert_eq!(results[0].matched_song.id, 0);
        assert_eq!(ids(&results[0].path), vec![0]);
    }

    #[test]
    fn test_two_hop_chain_reports_full_path() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine.search(&seed(), "Rock", 2).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.source_song.id, 0);
        assert_eq!(result.matched_song.id, 2);
        assert_eq!(result.distance, 2);
        assert_eq!(ids(&result.path), vec![0, 1, 2]);
    }

    #[test]
    fn test_depth_bound_stops_before_match() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        assert!(engine.search(&seed(), "rock", 1).unwrap().is_empty());
        // Depth zero still evaluates the seed itself.
        assert_eq!(engine.search(&seed(), "pop", 0).unwrap().len(), 1);
        assert!(engine.search(&seed(), "jazz", 0).unwrap().is_empty());
    }

    #[test]
    fn test_match_does_not_stop_expansion() {
        let mut catalog = chain();
        catalog.add_song(song(3, "Title D", "Artist W", &["Rock"]));
        catalog.add_sample(3, 2);
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine.search(&seed(), "rock", 3).unwrap();
        let matched: Vec<_> = results.iter().map(|r| (r.matched_song.id, r.distance)).collect();
        assert_eq!(matched, vec![(2, 2), (3, 3)]);
    }

    #[test]
    fn test_cycle_visits_seed_once() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_song(song(0, "Loop", "A", &["Soul"]));
        catalog.add_song(song(1, "Back", "B", &["Soul"]));
        catalog.add_sample(0, 1);
        catalog.add_sample(1, 0);
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine
            .search(&[SongQuery::new("Loop", "A")], "soul", 10)
            .unwrap();
        let matched: Vec<_> = results.iter().map(|r| r.matched_song.id).collect();
        assert_eq!(matched, vec![0, 1]);
    }

    #[test]
    fn test_duplicate_recording_bridges_to_samples() {
        let mut catalog = MemoryCatalog::new();
        let mut a = song(10, "Same Song", "Original", &[]);
        a.release_year = Some(1971);
        let mut b = song(11, "Same Song", "Reissue", &[]);
        b.release_year = Some(1971);
        catalog.add_song(a);
        catalog.add_song(b);
        catalog.add_song(song(12, "Target", "T", &["Funk"]));
        catalog.add_sample(10, 12);

        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine
            .search(&[SongQuery::new("Same Song", "Reissue")], "funk", 1)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].distance, 1);
        assert_eq!(ids(&results[0].path), vec![11, 12]);
    }

    #[test]
    fn test_missing_neighbor_is_skipped() {
        let mut catalog = chain();
        catalog.add_sample(0, 404);
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine.search(&seed(), "rock", 2).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_malformed_song_is_not_matched_or_expanded() {
        let mut catalog = chain();
        catalog.mark_malformed(1);
        let engine = SearchEngine::new(&catalog, &catalog);
        assert!(engine.search(&seed(), "rock", 5).unwrap().is_empty());
        assert!(engine.search(&seed(), "jazz", 5).unwrap().is_empty());
    }

    #[test]
    fn test_outage_aborts_whole_search() {
        let mut catalog = chain();
        catalog.mark_unavailable(2);
        let engine = SearchEngine::new(&catalog, &catalog);
        let err = engine.search(&seed(), "pop", 2).unwrap_err();
        assert!(matches!(err, SearchError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_results_are_per_seed() {
        let mut catalog = chain();
        catalog.add_song(song(5, "Other Seed", "Artist Q", &[]));
        catalog.add_sample(2, 5);
        let engine = SearchEngine::new(&catalog, &catalog);
        let seeds = vec![
            SongQuery::new("Title A", "Artist X"),
            SongQuery::new("Other Seed", "Artist Q"),
        ];
        let results = engine.search(&seeds, "rock", 3).unwrap();
        let pairs: Vec<_> = results
            .iter()
            .map(|r| (r.source_song.id, r.matched_song.id, r.distance))
            .collect();
        assert_eq!(pairs, vec![(0, 2, 2), (5, 2, 1)]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut catalog = chain();
        catalog.add_song(song(5, "Other Seed", "Artist Q", &["Rock"]));
        catalog.add_sample(2, 5);
        let seeds = vec![
            SongQuery::new("Title A", "Artist X"),
            SongQuery::new("Other Seed", "Artist Q"),
            SongQuery::new("Missing", "Nobody"),
        ];
        let sequential = SearchEngine::new(&catalog, &catalog)
            .search(&seeds, "rock", 4)
            .unwrap();
        let parallel = SearchEngine::new(&catalog, &catalog)
            .with_workers(3)
            .search(&seeds, "rock", 4)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_cancelled_token_fails_search() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        let token = CancelToken::new();
        token.cancel();
        let err = engine
            .search_with_cancel(&seed(), "rock", 2, &token)
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[test]
    fn test_expired_deadline_fails_search() {
        let catalog = chain();
        let engine = SearchEngine::new(&catalog, &catalog);
        let token = CancelToken::with_timeout(Duration::ZERO);
        let err = engine
            .search_with_cancel(&seed(), "rock", 2, &token)
            .unwrap_err();
        assert!(matches!(err, SearchError::TimedOut));
    }

    #[test]
    fn test_shared_identity_between_start_ids_is_claimed_once() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_song(song(1, "Twice", "Same", &["Dub"]));
        let mut reissue = song(2, "Twice", "Same", &["Dub"]);
        reissue.release_year = Some(2001);
        catalog.add_song(reissue);
        let engine = SearchEngine::new(&catalog, &catalog);
        let results = engine
            .search(&[SongQuery::new("Twice", "Same")], "dub", 3)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_song.id, 1);
    }

    #[test]
    fn test_unreadable_seed_is_skipped() {
        let mut catalog = chain();
        catalog.add_song(song(7, "Other", "Artist O", &["Rock"]));
        catalog.mark_unresolvable(0);
        let engine = SearchEngine::new(&catalog, &catalog);
        let seeds = vec![
            SongQuery::new("Title A", "Artist X"),
            SongQuery::new("Other", "Artist O"),
        ];
        let results = engine.search(&seeds, "rock", 2).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_song.id, 7);
    }

    #[test]
    fn test_unexpandable_song_is_still_matched() {
        let mut catalog = chain();
        catalog.mark_neighbors_malformed(1);
        let engine = SearchEngine::new(&catalog, &catalog);
        let jazz = engine.search(&seed(), "jazz", 5).unwrap();
        assert_eq!(jazz.len(), 1);
        assert_eq!(ids(&jazz[0].path), vec![0, 1]);
        // 2 is only reachable through 1.
        assert!(engine.search(&seed(), "rock", 5).unwrap().is_empty());
    }
}
