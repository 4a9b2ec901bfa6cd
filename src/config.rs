use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::history::TimeRange;
use crate::quote::QuoteSourceKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub quote_source: QuoteSourceKind,
    pub quote_url: String,
    pub http_timeout_secs: u64,
    pub completion_url: String,
    pub completion_model: String,
    /// Name of the environment variable holding the completion API key.
    pub completion_api_key_env: String,
    pub page_size: u32,
    pub history_range: TimeRange,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quote_source: QuoteSourceKind::Bundled,
            quote_url: "https://recite.onrender.com/api/v1/random".to_string(),
            http_timeout_secs: 10,
            completion_url: "https://api.openai.com/v1/chat/completions".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            completion_api_key_env: "KEYRACE_COMPLETION_API_KEY".to_string(),
            page_size: 10,
            history_range: TimeRange::Day,
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
    pub fn new() -> Self {
        Self::with_path(AppDirs::config_path())
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }),
            Err(_) => Config::default(),
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
