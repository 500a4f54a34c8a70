use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::phrase::Formality;
use crate::practice::PracticeConfig;
use crate::quota::FREE_DAILY_LIMIT;
use crate::reveal::{RevealMode, DEFAULT_PLACEHOLDER};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub auto_play_audio: bool,
    pub formality: Formality,
    pub unlimited: bool,
    pub daily_limit: u32,
    pub reveal_units: RevealMode,
    pub placeholder: String,
    /// e.g. `say -v Tingting` or `espeak -v zh`; no audio when unset
    pub speak_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_play_audio: true,
            formality: Formality::Informal,
            unlimited: false,
            daily_limit: FREE_DAILY_LIMIT,
            reveal_units: RevealMode::Chars,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            speak_command: None,
        }
    }
}

impl From<&Config> for PracticeConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            auto_play_audio: cfg.auto_play_audio,
            placeholder: if cfg.placeholder.is_empty() {
                DEFAULT_PLACEHOLDER.to_string()
            } else {
                cfg.placeholder.clone()
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "phrasedrill") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("phrasedrill_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring unreadable config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
