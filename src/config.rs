use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const APP_NAME: &str = "animap";

pub fn get_app_data_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_NAME);
        }
    }

    dirs::home_dir()
        .map(|h| h.join(format!(".{}", APP_NAME)))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("animap_config.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_anilist_api_url")]
    pub anilist_api_url: String,
    // Requests per rolling minute; AniList allows 90
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_search_page_size")]
    pub search_page_size: u32,
    // Response cache settings
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_anilist_api_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_rate_limit_per_minute() -> u32 {
    90
}

fn default_search_page_size() -> u32 {
    10
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> String {
    get_app_data_dir().join("cache").to_string_lossy().to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION"))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            anilist_api_url: default_anilist_api_url(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            search_page_size: default_search_page_size(),
            cache_enabled: default_cache_enabled(),
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Overrides settings from `ANIMAP_*` environment variables. Values that
    /// fail to parse are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ANIMAP_ANILIST_URL").filter(|v| !v.is_empty()) {
            self.anilist_api_url = url;
        }
        if let Some(limit) = lookup("ANIMAP_RATE_LIMIT").and_then(|v| v.trim().parse().ok()) {
            self.rate_limit_per_minute = limit;
        }
        if let Some(dir) = lookup("ANIMAP_CACHE_DIR").filter(|v| !v.is_empty()) {
            self.cache_dir = dir;
        }
        if let Some(flag) = lookup("ANIMAP_CACHE_DISABLED") {
            if matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes") {
                self.cache_enabled = false;
            }
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs.min(i64::MAX as u64) as i64)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Loads the config at `config_path`, writing a default one first if the
/// file does not exist yet.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        let default_config = Config::default();
        save_config(&default_config, config_path)?;
        return Ok(default_config);
    }

    let mut file = fs::File::open(config_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: Config = serde_json::from_str(&contents)?;
    Ok(config)
}

pub fn save_config(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let mut file = fs::File::create(config_path)?;
    file.write_all(json.as_bytes())?;

    Ok(())
}
