//! Configuration module
//!
//! The configuration is read from a TOML file, by default located in the
//! system's standard configuration directory. The server password may also
//! be supplied through the `LISTEN_NEXT_PASSWORD` environment variable.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the configured password
pub const PASSWORD_ENV: &str = "LISTEN_NEXT_PASSWORD";

/// Longest accepted retention window (100 years)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory location
    #[error("Failed to determine config directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the config file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML or misses required fields
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The configuration is syntactically fine but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Asking the user for the password failed
    #[error("Failed to read password: {0}")]
    PasswordPrompt(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerSettings,

    #[serde(default)]
    pub playlist: PlaylistSettings,

    #[serde(default)]
    pub cleanup: CleanupSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the Audiobookshelf server
    pub url: String,

    pub username: String,

    /// Prompted for interactively if not set here or in the environment
    pub password: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSettings {
    #[serde(default = "default_playlist_name")]
    pub name: String,

    /// Maximum number of episodes on the playlist
    #[serde(default = "default_count")]
    pub count: usize,

    /// Number of oldest unfinished episodes to leave out
    #[serde(default)]
    pub skip: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_older_than_days")]
    pub older_than_days: u32,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            name: default_playlist_name(),
            count: default_count(),
            skip: 0,
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            older_than_days: default_older_than_days(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or from the default location
    ///
    /// The password from the environment takes precedence over the one in
    /// the file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;

        let mut config = Self::parse(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.clone(),
            source: e,
        })?;

        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.server.password = Some(password);
        }

        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Checks that all values needed for a run are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.url.trim().is_empty() {
            return Err(ConfigError::Invalid("server.url must not be empty".to_string()));
        }
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "server.url must start with http:// or https://, got '{}'",
                self.server.url
            )));
        }
        if self.server.username.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.username must not be empty".to_string(),
            ));
        }
        if self.playlist.name.trim().is_empty() {
            return Err(ConfigError::Invalid("playlist.name must not be empty".to_string()));
        }
        if self.cleanup.older_than_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::Invalid(format!(
                "cleanup.older_than_days must be at most {}, got {}",
                MAX_RETENTION_DAYS, self.cleanup.older_than_days
            )));
        }

        Ok(())
    }

    /// Returns the password, asking for it on the terminal if none is configured
    pub fn password(&self) -> Result<String, ConfigError> {
        if let Some(password) = &self.server.password {
            return Ok(password.clone());
        }

        dialoguer::Password::new()
            .with_prompt(format!("Password for {}", self.server.username))
            .interact()
            .map_err(|e| ConfigError::PasswordPrompt(e.to_string()))
    }

    /// Timeout applied to every request to the server
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}

/// Location of the config file in the system's standard config directory
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = directories::ProjectDirs::from("", "", "listen-next")
        .ok_or(ConfigError::ConfigDirectoryNotFound)?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

// Default values
fn default_timeout_secs() -> u64 {
    30
}

fn default_playlist_name() -> String {
    "Listen Next".to_string()
}

fn default_count() -> usize {
    10
}

fn default_enabled() -> bool {
    true
}

fn default_older_than_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        url = "https://abs.example.com"
        username = "me"
    "#;

    #[test]
    fn test_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.server.password, None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.playlist.name, "Listen Next");
        assert_eq!(config.playlist.count, 10);
        assert_eq!(config.playlist.skip, 0);
        assert!(config.cleanup.enabled);
        assert_eq!(config.cleanup.older_than_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [server]
            url = "http://localhost:13378/"
            username = "me"
            password = "secret"
            timeout_secs = 5

            [playlist]
            name = "Up Next"
            count = 3
            skip = 2

            [cleanup]
            enabled = false
            older_than_days = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.password().unwrap(), "secret");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.playlist.name, "Up Next");
        assert_eq!(config.playlist.count, 3);
        assert_eq!(config.playlist.skip, 2);
        assert!(!config.cleanup.enabled);
        assert_eq!(config.cleanup.older_than_days, 7);
    }

    #[test]
    fn test_missing_server_section() {
        assert!(Config::parse("[playlist]\ncount = 3\n").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.server.url = "abs.example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::parse(MINIMAL).unwrap();
        config.playlist.name = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::parse(MINIMAL).unwrap();
        config.server.username = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::parse(MINIMAL).unwrap();
        config.cleanup.older_than_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());
        config.cleanup.older_than_days = 100_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/listen-next/config.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }
}
