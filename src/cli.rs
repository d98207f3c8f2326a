//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Samplehop using Clap
//! derive macros.
//!
//! ## Commands
//!
//! - `init-db`: Build the catalog database from a JSON catalog export
//! - `search`: Find songs of a genre reachable from seed songs
//! - `analyze`: Genre-group analysis over a listener's seed list
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! samplehop init-db catalog.json
//! samplehop search --seed "Paid in Full::Eric B. & Rakim" --genre soul
//! samplehop analyze --seeds-file top-tracks.txt --genre funk --json
//! ```

use crate::song::SongQuery;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Separator between title and artist in a `--seed` value.
pub const SEED_SEPARATOR: &str = "::";

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global options apply to every subcommand and override the runtime
/// config file.
#[derive(Parser, Debug)]
#[command(name = "samplehop")]
#[command(about = "Samplehop: trace sample chains to songs of a genre")]
#[command(version)]
pub struct Args {
    /// Catalog database to use instead of the default data directory
    #[arg(long, global = true, env = "SAMPLEHOP_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Search seeds on this many worker threads (0 = calling thread)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Abort a search that runs longer than this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the catalog database from a JSON catalog export
    ///
    /// The file holds `songs` (id, title, releaseYear, artists, genres) and
    /// `samples` (original, sampledIn) arrays. Everything is imported in a
    /// single transaction.
    InitDb {
        /// Path to the catalog JSON file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        catalog: PathBuf,

        /// Force overwrite existing database
        ///
        /// Without this flag, init-db fails if the database already exists.
        #[arg(long)]
        force: bool,
    },

    /// Find songs of a genre reachable from seed songs
    ///
    /// Walks sampling relationships and duplicate releases breadth-first
    /// from each seed and reports every song tagged with the genre, with the
    /// chain of songs that leads to it.
    Search {
        /// Seed song as "Title::Artist" (repeatable)
        #[arg(long = "seed", required = true, value_parser = parse_seed)]
        seeds: Vec<SongQuery>,

        /// Genre to look for (case-insensitive, whole tag)
        #[arg(long)]
        genre: String,

        /// Maximum number of hops from a seed
        ///
        /// Zero, negative or absent values use the configured default.
        #[arg(long, allow_negative_numbers = true)]
        max_depth: Option<i64>,

        /// Print results as a JSON graph document
        #[arg(long)]
        json: bool,
    },

    /// Genre-group analysis over a listener's seed list
    ///
    /// The genre is mapped onto its group first (e.g. "rap" searches the
    /// Hip-Hop / Rap / R&B group) and the search is kept shallow.
    Analyze {
        /// File with seeds: a JSON array of {"title", "artist"} objects or
        /// one "Title::Artist" per line
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        seeds_file: PathBuf,

        /// Genre or genre group to analyze
        #[arg(long)]
        genre: String,

        /// Print the matched songs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: samplehop completion bash > ~/.local/share/bash-completion/completions/samplehop
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Parses a `"Title::Artist"` seed. The last separator splits, so titles
/// may contain `::`.
///
/// # Errors
///
/// Fails when the separator is missing or either side is blank.
pub fn parse_seed(raw: &str) -> Result<SongQuery, String> {
    let (title, artist) = raw
        .rsplit_once(SEED_SEPARATOR)
        .ok_or_else(|| format!("expected \"Title{SEED_SEPARATOR}Artist\", got \"{raw}\""))?;
    let (title, artist) = (title.trim(), artist.trim());
    if title.is_empty() || artist.is_empty() {
        return Err(format!("seed \"{raw}\" needs both a title and an artist"));
    }
    Ok(SongQuery::new(title, artist))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_seed() {
        let seed = parse_seed("Paid in Full :: Eric B. & Rakim").unwrap();
        assert_eq!(seed, SongQuery::new("Paid in Full", "Eric B. & Rakim"));

        let seed = parse_seed("A::B::C").unwrap();
        assert_eq!(seed.title, "A::B");
        assert_eq!(seed.artist, "C");

        assert!(parse_seed("No separator").is_err());
        assert!(parse_seed("::Artist").is_err());
    }

    #[test]
    fn test_search_args() {
        let args = Args::try_parse_from([
            "samplehop", "--workers", "4", "search", "--seed", "T::A", "--seed", "U::B",
            "--genre", "funk", "--max-depth", "-1",
        ])
        .unwrap();
        assert_eq!(args.workers, Some(4));
        match args.command {
            Command::Search { seeds, genre, max_depth, json } => {
                assert_eq!(seeds.len(), 2);
                assert_eq!(genre, "funk");
                assert_eq!(max_depth, Some(-1));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_requires_seed() {
        assert!(Args::try_parse_from(["samplehop", "search", "--genre", "funk"]).is_err());
    }
}
