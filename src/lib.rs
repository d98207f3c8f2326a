//! Sample-chain genre search over a music catalog.
//!
//! Given seed songs and a target genre, Samplehop walks the catalog's
//! sampling relationships (and duplicate releases of the same recording)
//! breadth-first and reports every song of that genre within a hop bound,
//! together with the chain of songs leading to it.
//!
//! Core modules:
//! - [`search`] - Per-seed breadth-first search engine
//! - [`catalog`] - Collaborator traits the engine reads through
//! - [`db`] - SQLite-backed catalog store
//! - [`memory`] - In-memory catalog store
//! - [`graph`] - Graph document for presenting results
//!
//! ### Supporting Modules
//!
//! - [`song`] - Catalog entities and traversal identity
//! - [`genre`] - Genre matching and genre groups
//! - [`error`] - Store and search errors
//! - [`config`] - Data directory and runtime settings
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use samplehop::{config, db, search::SearchEngine, song::SongQuery};
//!
//! let db_path = config::get_db_path()?;
//! db::init_database(&db_path, "catalog.json".as_ref(), false)?;
//!
//! let store = db::SqliteStore::open(&db_path)?;
//! let engine = SearchEngine::new(&store, &store).with_workers(4);
//! let seeds = [SongQuery::new("Paid in Full", "Eric B. & Rakim")];
//! for result in engine.search(&seeds, "soul", config::DEFAULT_MAX_DEPTH)? {
//!     println!("{} ({} hops)", result.matched_song.title, result.distance);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Traversal Rules
//!
//! - Neighbors of a song are the other releases of the same recording
//!   (same title and release year) plus every song it samples or is
//!   sampled by.
//! - Each seed keeps its own visited set keyed by title and main artist,
//!   so a song is enqueued at most once per seed even across releases.
//! - Songs at the hop bound are checked for the genre but not expanded.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod genre;
pub mod graph;
pub mod memory;
pub mod search;
pub mod song;
