use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration overrides that can be saved to a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previews_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommend_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_capacity: Option<usize>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Config {
            previews_dir: None,
            search_limit: None,
            recommend_limit: None,
            sample_rate: None,
            http_timeout_secs: None,
            memo_capacity: None,
        }
    }

    /// Get the config file path (~/.config/soundalike/config.toml)
    pub fn get_config_path() -> Result<PathBuf, io::Error> {
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set")
        })?;

        let config_dir = Path::new(&home).join(".config").join("soundalike");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Return empty config if file doesn't exist
            return Ok(Config::new());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.previews_dir.is_some() {
            self.previews_dir = other.previews_dir.clone();
        }
        if other.search_limit.is_some() {
            self.search_limit = other.search_limit;
        }
        if other.recommend_limit.is_some() {
            self.recommend_limit = other.recommend_limit;
        }
        if other.sample_rate.is_some() {
            self.sample_rate = other.sample_rate;
        }
        if other.http_timeout_secs.is_some() {
            self.http_timeout_secs = other.http_timeout_secs;
        }
        if other.memo_capacity.is_some() {
            self.memo_capacity = other.memo_capacity;
        }
    }

    /// Resolve into concrete settings, filling in defaults
    pub fn resolve(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            previews_dir: self
                .previews_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(defaults.previews_dir),
            search_limit: self.search_limit.unwrap_or(defaults.search_limit),
            recommend_limit: self.recommend_limit.unwrap_or(defaults.recommend_limit),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            http_timeout: self
                .http_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            memo_capacity: self.memo_capacity.unwrap_or(defaults.memo_capacity),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Fully-resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding downloaded preview clips
    pub previews_dir: PathBuf,
    /// Top-N cutoff for catalog text searches
    pub search_limit: usize,
    /// Default size of a recommendation list
    pub recommend_limit: usize,
    /// Analysis sample rate previews are resampled to
    pub sample_rate: u32,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
    /// Capacity of the feature-extraction memo
    pub memo_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            previews_dir: PathBuf::from("previews"),
            search_limit: 10,
            recommend_limit: 10,
            sample_rate: 22_050,
            http_timeout: Duration::from_secs(20),
            memo_capacity: 50,
        }
    }
}
