//! Where the tutor keeps its files.
//!
//! | File | Directory | Linux example |
//! |------|-----------|---------------|
//! | `settings.toml` | platform config dir | `~/.config/asl-tutor/` |
//! | `progress.json` | platform config dir | `~/.config/asl-tutor/` |
//! | `frame.jpg` (snapshot camera) | platform cache dir | `~/.cache/asl-tutor/` |
//!
//! A platform without a config or cache directory gets the working
//! directory instead.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "asl-tutor";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Student progress record, owned by `ProgressStore`.
    pub progress_file: PathBuf,
    /// Default frame file read by `SnapshotCamera`.
    pub snapshot_file: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let or_cwd = |dir: Option<PathBuf>| dir.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);
        Self::under(&or_cwd(dirs::config_dir()), &or_cwd(dirs::cache_dir()))
    }

    /// Lay the files out under explicit directories.
    pub fn under(config_dir: &Path, cache_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            settings_file: config_dir.join("settings.toml"),
            progress_file: config_dir.join("progress.json"),
            snapshot_file: cache_dir.join("frame.jpg"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
