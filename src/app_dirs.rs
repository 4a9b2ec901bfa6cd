use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "keyrace";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    /// `$HOME/.local/state/keyrace`, falling back to the platform data dir.
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else if let Some(proj_dirs) = Self::project() {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(format!(".{APP_NAME}"))
        }
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("races.db")
    }

    pub fn log_dir() -> PathBuf {
        Self::state_dir().join("logs")
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from(format!("{APP_NAME}_config.json")))
    }

    pub fn account_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("account.json"))
            .unwrap_or_else(|| PathBuf::from(format!("{APP_NAME}_account.json")))
    }
}
