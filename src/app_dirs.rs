use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const DB_FILE: &str = "phrases.db";
const CONFIG_FILE: &str = "config.json";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("phrasedrill");
            Some(state_dir.join(DB_FILE))
        } else {
            ProjectDirs::from("", "", "phrasedrill")
                .map(|proj_dirs| proj_dirs.data_local_dir().join(DB_FILE))
        }
    }

    /// Database and config both live under `dir` when it is given explicitly
    pub fn db_path_in(dir: &Path) -> PathBuf {
        dir.join(DB_FILE)
    }

    pub fn config_path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }
}
