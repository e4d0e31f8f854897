// Client configuration, loaded from `~/.cowrite/config.toml`.
//
// Every field has a default, so a missing or partial file is fine and a
// fresh install works with no setup against a local stack.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::save::CoalesceConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid url for `{field}`: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Per-user client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Document store base URL.
    pub api_url: String,
    /// Relay base URL (wss, or ws for localhost).
    pub ws_url: String,
    /// Display name shown to collaborators; defaults to anonymous.
    pub display_name: Option<String>,
    pub save: SaveConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/".into(),
            ws_url: "ws://localhost:8000/ws/".into(),
            display_name: None,
            save: SaveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Quiescence window for coalescing saves, in milliseconds.
    pub coalesce_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { coalesce_ms: 1_000 }
    }
}

impl SaveConfig {
    /// Scheduler config with the window clamped to its allowed range.
    pub fn coalesce(&self) -> CoalesceConfig {
        CoalesceConfig::with_millis(self.coalesce_ms)
    }
}

impl ClientConfig {
    /// Load from the default location, falling back to defaults if the
    /// file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Write the config out (e.g. after first-run setup).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_url)
            .map_err(|source| ConfigError::InvalidUrl { field: "api_url", source })
    }

    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.ws_url)
            .map_err(|source| ConfigError::InvalidUrl { field: "ws_url", source })
    }
}

/// `~/.cowrite`
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cowrite"))
}

/// `~/.cowrite/config.toml`
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults_point_at_a_local_stack() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000/api/");
        assert_eq!(config.ws_url, "ws://localhost:8000/ws/");
        assert_eq!(config.save.coalesce_ms, 1_000);
        assert!(config.display_name.is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = \"https://notes.example/api/\"\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.api_url, "https://notes.example/api/");
        assert_eq!(config.ws_url, ClientConfig::default().ws_url);
        assert_eq!(config.save.coalesce_ms, 1_000);
    }

    #[test]
    fn nested_save_table_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[save]\ncoalesce_ms = 2000\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.save.coalesce_ms, 2_000);
        assert_eq!(config.save.coalesce().window, Duration::from_millis(2_000));
    }

    #[test]
    fn coalesce_window_is_clamped_through_to_the_scheduler() {
        let save = SaveConfig { coalesce_ms: 5 };
        assert_eq!(save.coalesce().window, Duration::from_millis(250));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ClientConfig::default();
        config.api_url = "https://notes.example/api/".into();
        config.display_name = Some("ada".into());
        config.save.coalesce_ms = 750;

        config.save_to(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = [not toml").unwrap();

        assert!(matches!(ClientConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn url_accessors_reject_garbage() {
        let config = ClientConfig { api_url: "not a url".into(), ..Default::default() };
        assert!(matches!(
            config.api_url(),
            Err(ConfigError::InvalidUrl { field: "api_url", .. })
        ));
        assert!(config.ws_url().is_ok());
    }
}
