use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

const APP_DIR: &str = "subfeed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub google_client_id: String,
    #[serde(default)]
    pub google_client_secret: String,

    pub webhook_url: Option<String>,

    #[serde(default = "default_normal_cycle")]
    pub normal_cycle_minutes: u32,

    #[serde(default = "default_fast_cycle")]
    pub fast_cycle_minutes: u32,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_minutes: u32,

    /// Uploads requested per channel visit.
    #[serde(default = "default_recent_uploads")]
    pub recent_uploads: u32,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("subfeed.db").to_string_lossy().to_string()
}

fn default_normal_cycle() -> u32 {
    30
}

fn default_fast_cycle() -> u32 {
    10
}

fn default_sync_interval() -> u32 {
    10
}

fn default_recent_uploads() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            webhook_url: None,
            normal_cycle_minutes: default_normal_cycle(),
            fast_cycle_minutes: default_fast_cycle(),
            sync_interval_minutes: default_sync_interval(),
            recent_uploads: default_recent_uploads(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read the file at `path`, writing the defaults there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.normal_cycle_minutes == 0 || self.fast_cycle_minutes == 0 || self.sync_interval_minutes == 0 {
            return Err(AppError::Config("cycle and sync intervals must be at least one minute".to_string()));
        }
        if !(1..=50).contains(&self.recent_uploads) {
            return Err(AppError::Config("recent_uploads must be between 1 and 50".to_string()));
        }
        Ok(())
    }

    pub fn normal_cycle(&self) -> Duration {
        minutes(self.normal_cycle_minutes)
    }

    pub fn fast_cycle(&self) -> Duration {
        minutes(self.fast_cycle_minutes)
    }

    pub fn sync_interval(&self) -> Duration {
        minutes(self.sync_interval_minutes)
    }
}

fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * 60)
}
