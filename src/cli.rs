use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::fetch::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::paths::DEFAULT_EXPORT_PATH;

#[derive(Parser, Debug)]
#[command(name = "pokeindex-sync")]
#[command(version, about = "Mirror the PokeAPI catalog into SQLite and export it as JSON")]
pub struct Cli {
    /// Log filter (e.g. info, debug, pokeindex_sync=trace)
    #[arg(long, global = true, env = "POKEINDEX_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch entries from the API into the local snapshot
    Sync {
        /// Snapshot database path
        #[arg(long, env = "POKEINDEX_DB")]
        db: Option<PathBuf>,

        /// Only sync these entries (comma-separated names or ids)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "offset")]
        names: Option<Vec<String>>,

        /// Stop after this many entries
        #[arg(short, long)]
        limit: Option<u32>,

        /// Skip this many catalog entries before starting
        #[arg(short, long, default_value_t = 0)]
        offset: u32,

        /// Entries requested per listing page (1-500)
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Minimum delay between request starts, in milliseconds
        #[arg(long, default_value_t = 200)]
        delay_ms: u64,

        /// Attempts per request before giving up
        #[arg(long, default_value_t = 6)]
        max_attempts: u32,

        /// Base retry backoff in milliseconds, doubled per attempt
        #[arg(long, default_value_t = 300)]
        backoff_ms: u64,

        /// API root
        #[arg(long, env = "POKEINDEX_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Show the full-screen progress view
        #[arg(long)]
        tui: bool,
    },

    /// Write the flattened JSON document from the snapshot
    Export {
        /// Snapshot database path
        #[arg(long, env = "POKEINDEX_DB")]
        db: Option<PathBuf>,

        /// Output JSON path
        #[arg(short, long, default_value = DEFAULT_EXPORT_PATH)]
        output: PathBuf,
    },

    /// Show row counts for every snapshot table
    Status {
        /// Snapshot database path
        #[arg(long, env = "POKEINDEX_DB")]
        db: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_defaults() {
        let cli = Cli::try_parse_from(["pokeindex-sync", "sync", "--names", "pikachu,eevee"]).unwrap();
        match cli.command {
            Commands::Sync {
                names,
                page_size,
                delay_ms,
                max_attempts,
                tui,
                ..
            } => {
                assert_eq!(names, Some(vec!["pikachu".to_string(), "eevee".to_string()]));
                assert_eq!(page_size, 200);
                assert_eq!(delay_ms, 200);
                assert_eq!(max_attempts, 6);
                assert!(!tui);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_names_conflict_with_offset() {
        let result = Cli::try_parse_from([
            "pokeindex-sync",
            "sync",
            "--names",
            "pikachu",
            "--offset",
            "10",
        ]);
        assert!(result.is_err());
    }
}
