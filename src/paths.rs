use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_FILE: &str = "pokeindex.db";
pub const DEFAULT_EXPORT_PATH: &str = "docs/data/pokemon.json";

/// Per-user data directory holding the default snapshot
pub struct DataDirs {
    data_dir: PathBuf,
}

impl DataDirs {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "pokeindex")
                    .context("Could not determine data directory")?;
                proj_dirs.data_dir().to_path_buf()
            }
        };

        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(Self { data_dir })
    }

    /// Default snapshot location
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }
}

/// `explicit` if given, else the snapshot in the default data directory
pub fn resolve_snapshot(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(DataDirs::new(None)?.snapshot_path()),
    }
}

/// Log file kept beside `snapshot` (`pokeindex.db` -> `pokeindex.log`).
/// Only the snapshot's own directory is created.
pub fn snapshot_log_path(snapshot: &Path) -> Result<PathBuf> {
    if let Some(parent) = snapshot.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(snapshot.with_extension("log"))
}
