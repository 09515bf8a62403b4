//! Application configuration, read once at startup from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use marquee_api::{ApiConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_PATH: &str = "marquee.ron";
pub const API_KEY_ENV: &str = "MARQUEE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiSection,
    /// Quiet period before a query edit triggers a search.
    pub debounce_ms: u64,
    /// Entries shown in the trending list.
    pub trending_limit: usize,
    /// Directory holding the trending searches file.
    pub state_dir: PathBuf,
    pub log: LogDestination,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiSection::default(),
            debounce_ms: 500,
            trending_limit: 5,
            state_dir: PathBuf::from("."),
            log: LogDestination::File,
            verbose: false,
        }
    }
}

impl AppConfig {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Uses `key` when the file did not configure one.
    pub fn with_fallback_api_key(mut self, key: Option<String>) -> Self {
        if self.api.api_key.is_none() {
            self.api.api_key = key.filter(|key| !key.trim().is_empty());
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            api_key: self.api.api_key.clone(),
            connect_timeout: Duration::from_millis(self.api.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.api.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("marquee.ron");
        fs::write(
            &path,
            r#"(api: (base_url: "http://localhost:9000/3", request_timeout_ms: 2000), debounce_ms: 250, log: Terminal)"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.log, LogDestination::Terminal);
        assert_eq!(config.trending_limit, 5);

        let api = config.api_config();
        assert_eq!(api.base_url, "http://localhost:9000/3");
        assert_eq!(api.request_timeout, Duration::from_secs(2));
        assert_eq!(api.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("marquee.ron");
        fs::write(&path, "(debounce_ms: \"soon\")").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn file_key_wins_over_fallback() {
        let mut config = AppConfig::default();
        config.api.api_key = Some("from-file".to_string());
        let config = config.with_fallback_api_key(Some("from-env".to_string()));
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));

        let config = AppConfig::default().with_fallback_api_key(Some("  ".to_string()));
        assert_eq!(config.api.api_key, None);

        let config = AppConfig::default().with_fallback_api_key(Some("from-env".to_string()));
        assert_eq!(config.api.api_key.as_deref(), Some("from-env"));
    }
}
