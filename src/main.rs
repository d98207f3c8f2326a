//! # Samplehop
//!
//! Command-line front end for the sample-chain genre search.
//!
//! ## Usage
//!
//! ```bash
//! # Build the catalog database
//! samplehop init-db catalog.json
//!
//! # Songs tagged "soul" within 3 hops of a seed
//! samplehop search --seed "Paid in Full::Eric B. & Rakim" --genre soul --max-depth 3
//!
//! # Genre-group analysis of a listener's top tracks
//! samplehop analyze --seeds-file top-tracks.txt --genre rap
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use samplehop::cli::{self, Command};
use samplehop::config::{self, RuntimeConfig};
use samplehop::db::{self, SqliteStore};
use samplehop::graph::GraphDocument;
use samplehop::search::{CancelToken, SearchEngine};
use samplehop::song::{identity_key, SearchResult, SongQuery};
use samplehop::{completion, genre};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Main entry point for the Samplehop application.
///
/// Initializes logging and routes commands. Commands that touch the catalog
/// merge the runtime config with the command-line flags first. Errors
/// propagate to a non-zero exit; an empty result set is not an error.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug samplehop search ...` - Enable debug logging
/// - `RUST_LOG=samplehop::search=trace samplehop search ...` - Per-node tracing
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    // Completion scripts must work even when the config file is broken.
    let load_settings = || runtime_settings(args.db.as_deref(), args.workers, args.timeout);

    match args.command {
        Command::InitDb { catalog, force } => {
            let settings = load_settings()?;
            info!("Initializing catalog database from: {}", catalog.display());
            let stats = db::init_database(&settings.db_path, &catalog, force)?;
            println!(
                "Imported {} songs and {} sample relationships into {}",
                stats.songs,
                stats.samples,
                settings.db_path.display()
            );
        }
        Command::Search { seeds, genre, max_depth, json } => {
            let settings = load_settings()?;
            let depth = config::effective_max_depth(max_depth, settings.default_max_depth);
            info!("Searching for '{genre}' within {depth} hops of {} seed(s)", seeds.len());
            let results = run_search(&settings, &seeds, &genre, depth)?;

            if json {
                print_json(&GraphDocument::from_results(&results))?;
            } else {
                print_results(&results);
            }
        }
        Command::Analyze { seeds_file, genre: requested, json } => {
            let settings = load_settings()?;
            let seeds = read_seeds_file(&seeds_file)?;
            let group = genre::normalize_genre(&requested);
            let target = genre::search_genre(&group);
            info!(
                "Analyzing {} seed(s) for group '{group}' (searching '{target}')",
                seeds.len()
            );
            let results = run_search(&settings, &seeds, &target, settings.analysis_max_depth)?;
            let songs = matched_songs(&results);

            if json {
                print_json(&songs)?;
            } else if songs.is_empty() {
                println!("No matches");
            } else {
                println!("{group}:");
                for song in songs {
                    println!("  {} - {}", song.artist, song.title);
                }
            }
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

/// Loads the runtime config and applies the global flags on top of it.
fn runtime_settings(
    db_path: Option<&Path>,
    workers: Option<usize>,
    timeout: Option<u64>,
) -> Result<RuntimeConfig> {
    let mut settings = RuntimeConfig::load()?;
    if let Some(db_path) = db_path {
        settings = settings.with_db_path(db_path);
    }
    if let Some(workers) = workers {
        settings.workers = workers;
    }
    if let Some(timeout) = timeout {
        settings.timeout_secs = Some(timeout);
    }
    debug!("Runtime settings: {settings:?}");
    Ok(settings)
}

fn run_search(
    settings: &RuntimeConfig,
    seeds: &[SongQuery],
    target_genre: &str,
    max_depth: usize,
) -> Result<Vec<SearchResult>> {
    if !settings.db_path.exists() {
        anyhow::bail!(
            "No catalog database at {}. Run `samplehop init-db <catalog.json>` first.",
            settings.db_path.display()
        );
    }
    let store = SqliteStore::open_pooled(&settings.db_path, settings.workers.max(1))?;
    let engine = SearchEngine::new(&store, &store).with_workers(settings.workers);
    let cancel = match settings.timeout() {
        Some(timeout) => CancelToken::with_timeout(timeout),
        None => CancelToken::new(),
    };

    let results = engine
        .search_with_cancel(seeds, target_genre, max_depth, &cancel)
        .context("Search failed")?;
    info!("Search finished with {} result(s)", results.len());
    Ok(results)
}

/// Reads analysis seeds: a JSON array of `{"title", "artist"}` objects, or
/// one `Title::Artist` per line (blank lines and `#` comments ignored).
fn read_seeds_file(path: &Path) -> Result<Vec<SongQuery>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seeds file {}", path.display()))?;

    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw)
            .with_context(|| format!("Invalid seeds JSON in {}", path.display()));
    }

    raw.lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            cli::parse_seed(line)
                .map_err(|e| anyhow::anyhow!("{}:{n}: {e}", path.display()))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct MatchedSong {
    title: String,
    artist: String,
}

/// Matched songs in result order, once per traversal identity.
fn matched_songs(results: &[SearchResult]) -> Vec<MatchedSong> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|result| seen.insert(identity_key(&result.matched_song)))
        .map(|result| MatchedSong {
            title: result.matched_song.title.clone(),
            artist: result.matched_song.main_artist().unwrap_or_default().to_string(),
        })
        .collect()
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No matches");
        return;
    }

    for result in results {
        let chain: Vec<String> = result
            .path
            .iter()
            .map(|song| match song.main_artist() {
                Some(artist) => format!("{artist} - {}", song.title),
                None => song.title.clone(),
            })
            .collect();
        println!(
            "[{}] {} <- {}",
            result.distance,
            result.matched_song.title,
            result.source_song.title
        );
        println!("    {}", chain.join(" -> "));
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
