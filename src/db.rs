//! SQLite-backed sample catalog.
//!
//! Schema:
//!
//! ```text
//! song(id, title, release_year)
//! artist(id, name)
//! song_artist(song_id, artist_id, is_main, position)
//! genre(id, name)
//! song_genre(song_id, genre_id)
//! sample(original_song_id, sampled_in_song_id)
//! ```
//!
//! Each connection is guarded by a mutex, so the store can be shared by
//! search workers. A store opened with [`SqliteStore::open_pooled`] keeps one
//! connection per worker thread; lookups from other threads use the first
//! connection. Admin operations (schema, import) return
//! `anyhow` errors; lookups return [`StoreError`] so the search engine can
//! tell a missing row from an unreachable database.

use crate::catalog::{CatalogFile, RelationshipExpander, SongCatalog};
use crate::error::StoreError;
use crate::song::{Artist, Song, SongId};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS song (
        id           INTEGER PRIMARY KEY,
        title        TEXT    NOT NULL,
        release_year INTEGER
    );
    CREATE TABLE IF NOT EXISTS artist (
        id   INTEGER PRIMARY KEY,
        name TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS song_artist (
        song_id   INTEGER NOT NULL REFERENCES song(id),
        artist_id INTEGER NOT NULL REFERENCES artist(id),
        is_main   INTEGER NOT NULL DEFAULT 0,
        position  INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (song_id, artist_id)
    );
    CREATE TABLE IF NOT EXISTS genre (
        id   INTEGER PRIMARY KEY,
        name TEXT    NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS song_genre (
        song_id  INTEGER NOT NULL REFERENCES song(id),
        genre_id INTEGER NOT NULL REFERENCES genre(id),
        PRIMARY KEY (song_id, genre_id)
    );
    CREATE TABLE IF NOT EXISTS sample (
        original_song_id   INTEGER NOT NULL,
        sampled_in_song_id INTEGER NOT NULL,
        PRIMARY KEY (original_song_id, sampled_in_song_id)
    );
    CREATE INDEX IF NOT EXISTS idx_song_title ON song(title, release_year);
    CREATE INDEX IF NOT EXISTS idx_artist_name ON artist(name);
    CREATE INDEX IF NOT EXISTS idx_sample_sampled_in ON sample(sampled_in_song_id);
";

/// Duplicate-recording group of `?1` (same title, same release year, NULL
/// years equal) plus both directions of every sample edge touching it.
const NEIGHBORS_SQL: &str = "
    WITH same_songs AS (
        SELECT s1.id
        FROM song s1
        JOIN song s2 ON s2.id = ?1
        WHERE s1.title = s2.title
          AND s1.release_year IS s2.release_year
    )
    SELECT neighbor_id FROM (
        SELECT id AS neighbor_id FROM same_songs

        UNION

        SELECT sa.sampled_in_song_id
        FROM same_songs ss
        JOIN sample sa ON ss.id = sa.original_song_id

        UNION

        SELECT sa.original_song_id
        FROM same_songs ss
        JOIN sample sa ON ss.id = sa.sampled_in_song_id
    )
    WHERE neighbor_id <> ?1
    ORDER BY neighbor_id
";

/// Counts written by [`SqliteStore::import_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub songs: usize,
    pub samples: usize,
}

#[derive(Debug)]
pub struct SqliteStore {
    conns: Vec<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_pooled(path, 1)
    }

    /// Opens `connections` connections to the database at `path`.
    ///
    /// Search worker `i` uses connection `i % connections`, so a pool as large
    /// as the worker count lets seeds query in parallel.
    ///
    /// # Errors
    ///
    /// Fails if any connection cannot be opened or the schema cannot be
    /// created.
    pub fn open_pooled(path: &Path, connections: usize) -> Result<Self> {
        let connect = || {
            Connection::open(path)
                .with_context(|| format!("SQLite connection refused. DB location: {}", path.display()))
        };

        let mut store = Self::from_connection(connect()?)?;
        for _ in 1..connections.max(1) {
            store.conns.push(Mutex::new(connect()?));
        }
        debug!("Opened {} connection(s) to {}", store.conns.len(), path.display());
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Fails only if SQLite itself cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::from_connection(conn)
    }

    /// Wraps an existing connection and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Fails if the schema statements are rejected.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Invalid SQL when creating catalog schema")?;
        Ok(Self {
            conns: vec![Mutex::new(conn)],
        })
    }

    /// Writes every song, credit, genre tag and sample edge of `catalog` in
    /// one transaction. Existing rows with the same ids are replaced.
    ///
    /// # Errors
    ///
    /// Fails (and rolls back) on the first rejected statement.
    pub fn import_catalog(&self, catalog: &CatalogFile) -> Result<ImportStats> {
        let mut conn = self.conns[0]
            .lock()
            .map_err(|_| anyhow::anyhow!("Catalog connection lock poisoned"))?;
        let tx = conn.transaction()?;

        {
            let mut insert_song =
                tx.prepare("INSERT OR REPLACE INTO song (id, title, release_year) VALUES (?1, ?2, ?3)")?;
            let mut clear_credits = tx.prepare("DELETE FROM song_artist WHERE song_id = ?1")?;
            let mut clear_genres = tx.prepare("DELETE FROM song_genre WHERE song_id = ?1")?;
            let mut insert_artist = tx.prepare("INSERT OR REPLACE INTO artist (id, name) VALUES (?1, ?2)")?;
            let mut insert_credit = tx.prepare(
                "INSERT OR REPLACE INTO song_artist (song_id, artist_id, is_main, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut insert_genre = tx.prepare("INSERT OR IGNORE INTO genre (name) VALUES (?1)")?;
            let mut genre_id = tx.prepare("SELECT id FROM genre WHERE name = ?1")?;
            let mut tag_song =
                tx.prepare("INSERT OR IGNORE INTO song_genre (song_id, genre_id) VALUES (?1, ?2)")?;

            for song in &catalog.songs {
                insert_song
                    .execute(params![song.id, song.title, song.release_year])
                    .with_context(|| format!("Invalid SQL statement when INSERTing song {}", song.id))?;
                clear_credits.execute([song.id])?;
                clear_genres.execute([song.id])?;

                for (position, artist) in song.artists.iter().enumerate() {
                    insert_artist.execute(params![artist.id, artist.name])?;
                    insert_credit
                        .execute(params![song.id, artist.id, artist.is_main, position as i64])
                        .with_context(|| {
                            format!("Failed to credit artist {} on song {}", artist.id, song.id)
                        })?;
                }

                for genre in &song.genres {
                    insert_genre.execute([genre])?;
                    let id: i64 = genre_id.query_row([genre], |row| row.get(0))?;
                    tag_song.execute(params![song.id, id])?;
                }
            }
        }

        let mut samples = 0;
        {
            let mut insert_sample = tx.prepare(
                "INSERT OR IGNORE INTO sample (original_song_id, sampled_in_song_id) VALUES (?1, ?2)",
            )?;
            for edge in &catalog.samples {
                samples += insert_sample
                    .execute(params![edge.original, edge.sampled_in])
                    .with_context(|| {
                        format!("Failed to INSERT sample {} -> {}", edge.original, edge.sampled_in)
                    })?;
            }
        }

        tx.commit().context("Committing catalog import failed.")?;

        let stats = ImportStats {
            songs: catalog.songs.len(),
            samples,
        };
        debug!("Imported {} songs and {} sample edges", stats.songs, stats.samples);
        Ok(stats)
    }

    /// Number of songs currently stored.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be queried.
    pub fn song_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM song", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Number of connections lookups are spread over.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        let slot = rayon::current_thread_index().unwrap_or(0) % self.conns.len();
        self.conns[slot]
            .lock()
            .map_err(|_| StoreError::Unavailable("catalog connection lock poisoned".into()))
    }
}

/// Creates a fresh database at `db_path` from the catalog file at
/// `catalog_path`.
///
/// Refuses to touch an existing database unless `force` is set, in which
/// case the old file is removed first.
///
/// # Errors
///
/// Fails if the database exists without `force`, or on any I/O, parse or
/// SQL error.
pub fn init_database(db_path: &Path, catalog_path: &Path, force: bool) -> Result<ImportStats> {
    if db_path.exists() {
        if !force {
            bail!(
                "Database already exists at {}. Use --force to overwrite.",
                db_path.display()
            );
        }
        fs::remove_file(db_path)
            .with_context(|| format!("Failed to remove existing database {}", db_path.display()))?;
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }

    let catalog = CatalogFile::load(catalog_path)?;
    let store = SqliteStore::open(db_path)?;
    let stats = store.import_catalog(&catalog)?;
    info!(
        "Initialized {} with {} songs and {} samples",
        db_path.display(),
        stats.songs,
        stats.samples
    );
    Ok(stats)
}

/// Maps a lookup failure for song `id` onto the soft/hard taxonomy.
fn classify(err: rusqlite::Error, id: SongId) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(id),
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Malformed {
            id,
            reason: err.to_string(),
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl SongCatalog for SqliteStore {
    fn resolve_by_title_artist(&self, title: &str, artist: &str) -> Result<Vec<SongId>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT s.id
                 FROM song s
                 JOIN song_artist sa ON s.id = sa.song_id
                 JOIN artist a ON sa.artist_id = a.id
                 WHERE s.title = ?1 AND a.name = ?2
                 ORDER BY s.id",
            )
            .map_err(unavailable)?;

        let ids = stmt
            .query_map([title, artist], |row| row.get(0))
            .map_err(unavailable)?
            .collect::<Result<Vec<SongId>, _>>()
            .map_err(unavailable)?;
        Ok(ids)
    }

    fn load_song_detail(&self, id: SongId) -> Result<Song, StoreError> {
        let conn = self.lock()?;

        let (title, release_year): (String, Option<i32>) = conn
            .prepare_cached("SELECT title, release_year FROM song WHERE id = ?1")
            .map_err(unavailable)?
            .query_row([id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| classify(e, id))?;

        let artists = conn
            .prepare_cached(
                "SELECT a.id, a.name, sa.is_main
                 FROM song_artist sa
                 JOIN artist a ON sa.artist_id = a.id
                 WHERE sa.song_id = ?1
                 ORDER BY sa.position, a.id",
            )
            .map_err(unavailable)?
            .query_map([id], |row| {
                Ok(Artist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_main: row.get(2)?,
                })
            })
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify(e, id))?;

        let genres = conn
            .prepare_cached(
                "SELECT g.name
                 FROM song_genre sg
                 JOIN genre g ON g.id = sg.genre_id
                 WHERE sg.song_id = ?1
                 ORDER BY g.name",
            )
            .map_err(unavailable)?
            .query_map([id], |row| row.get(0))
            .map_err(unavailable)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| classify(e, id))?;

        Ok(Song {
            id,
            title,
            artists,
            genres,
            release_year,
        })
    }
}

impl RelationshipExpander for SqliteStore {
    fn load_neighbors(&self, id: SongId) -> Result<Vec<SongId>, StoreError> {
        let conn = self.lock()?;

        // A song that vanished since its detail load is missing, not isolated.
        let exists = conn
            .query_row("SELECT 1 FROM song WHERE id = ?1", [id], |_| Ok(()))
            .optional()
            .map_err(unavailable)?;
        if exists.is_none() {
            return Err(StoreError::NotFound(id));
        }

        let mut stmt = conn.prepare_cached(NEIGHBORS_SQL).map_err(unavailable)?;
        let neighbors = stmt
            .query_map([id], |row| row.get(0))
            .map_err(unavailable)?
            .collect::<Result<Vec<SongId>, _>>()
            .map_err(|e| classify(e, id))?;
        Ok(neighbors)
    }
}
