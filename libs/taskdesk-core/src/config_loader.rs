//! Configuration Loader
//!
//! Resolves an [`AppConfig`] from defaults, configuration files, the
//! environment and caller-supplied overrides, in that order of precedence.

use crate::config::{AppConfig, PartialConfig};
use crate::error::{Result, TaskdeskError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "TASKDESK_CONFIG";

/// Builder that layers configuration sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: AppConfig,
    /// Optional files, read if present, in order
    config_paths: Vec<PathBuf>,
    /// A file that must exist
    explicit_path: Option<PathBuf>,
    load_from_env: bool,
    overrides: PartialConfig,
    validate: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: AppConfig::default(),
            config_paths: Self::get_default_config_paths(),
            explicit_path: None,
            load_from_env: true,
            overrides: PartialConfig::default(),
            validate: true,
        }
    }

    #[must_use]
    pub fn with_base_config(mut self, config: AppConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Replace the optional search paths
    #[must_use]
    pub fn with_config_paths<P: AsRef<Path>>(mut self, paths: Vec<P>) -> Self {
        self.config_paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        self
    }

    /// Read this file instead of the search paths; loading fails if it is missing
    #[must_use]
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        self.explicit_path = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    /// Highest-precedence values, typically from command-line flags
    #[must_use]
    pub fn with_overrides(mut self, overrides: PartialConfig) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    fn explicit_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }
        if !self.load_from_env {
            return None;
        }
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Load configuration from all sources
    ///
    /// # Errors
    /// Returns an error if an explicit file is missing, any source fails to
    /// parse, or validation is enabled and fails
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = self.base_config.clone();

        if let Some(path) = self.explicit_file() {
            if !path.exists() {
                return Err(TaskdeskError::configuration(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config.merge_with(&PartialConfig::from_file(&path)?);
            info!("Loaded configuration from {}", path.display());
        } else {
            for path in &self.config_paths {
                if path.exists() {
                    config.merge_with(&PartialConfig::from_file(path)?);
                    info!("Loaded configuration from {}", path.display());
                } else {
                    debug!("Configuration file not found: {}", path.display());
                }
            }
        }

        if self.load_from_env {
            config.merge_with(&PartialConfig::from_env()?);
        }
        config.merge_with(&self.overrides);

        if self.validate {
            config.validate()?;
            debug!("Configuration validation passed");
        }
        Ok(config)
    }

    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("taskdesk.yaml"),
            PathBuf::from("taskdesk.yml"),
            Self::get_user_config_dir().join("config.yaml"),
        ]
    }

    #[must_use]
    pub fn get_user_config_dir() -> PathBuf {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg).join("taskdesk")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config").join("taskdesk")
        } else {
            PathBuf::from(".taskdesk")
        }
    }
}
