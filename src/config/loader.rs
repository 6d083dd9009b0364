//! Configuration loading with hierarchy merging.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConfigError;
use super::schema::Config;

/// Loads and merges configuration sources.
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader rooted at the platform config directory
    /// (`~/.config/portway/config.toml` on Linux).
    pub fn new() -> Self {
        Self {
            user_config_path: dirs::config_dir().map(|dir| dir.join("portway").join("config.toml")),
        }
    }

    /// Loader with an explicit user config path (used by tests).
    pub fn with_user_config_path(path: PathBuf) -> Self {
        Self {
            user_config_path: Some(path),
        }
    }

    /// Load defaults, then the user config if present, then `extra` if
    /// given.
    ///
    /// A missing user config is fine; a missing or malformed `--config`
    /// file is an error, since the user asked for it explicitly.
    pub fn load(&self, extra: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = &self.user_config_path {
            if path.exists() {
                debug!("Loading user config from {}", path.display());
                config.merge(Self::read(path)?);
            }
        }

        if let Some(path) = extra {
            debug!("Loading additional config from {}", path.display());
            config.merge(Self::read(path)?);
        }

        Ok(config)
    }

    fn read(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_without_any_file_is_defaults() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::with_user_config_path(dir.path().join("missing.toml"));

        let config = loader.load(None).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_user_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 9090\n").unwrap();

        let loader = ConfigLoader::with_user_config_path(path);
        let config = loader.load(None).unwrap();
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_extra_config_wins_over_user_config() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let extra = dir.path().join("extra.toml");
        fs::write(&user, "[server]\nport = 9090\n[check]\nconcurrency = 16\n").unwrap();
        fs::write(&extra, "[server]\nport = 9999\n").unwrap();

        let loader = ConfigLoader::with_user_config_path(user);
        let config = loader.load(Some(&extra)).unwrap();
        assert_eq!(config.server.port, 9999);
        // Sections the overlay leaves alone keep the user values.
        assert_eq!(config.check.concurrency, 16);
    }

    #[test]
    fn test_missing_extra_config_is_an_error() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::with_user_config_path(dir.path().join("missing.toml"));

        let result = loader.load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "server = \"not a table\"\n").unwrap();

        let loader = ConfigLoader::with_user_config_path(path.clone());
        let result = loader.load(None);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
