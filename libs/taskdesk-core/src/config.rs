//! Application configuration
//!
//! Values are layered: built-in defaults, then a YAML file, then `TASKDESK_*`
//! environment variables, then command-line flags. Each layer is a
//! [`PartialConfig`] where only the keys it sets are `Some`.

use crate::error::{Result, TaskdeskError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use taskdesk_common::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_REPORT_MAX_TASKS, DEFAULT_UPLOAD_DIR,
};

/// Shortest accepted signing secret, in bytes
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

const ENV_PREFIX: &str = "TASKDESK_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = TaskdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TaskdeskError::configuration(format!(
                "Unknown log format '{other}', expected 'text' or 'json'"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Fully resolved configuration
#[derive(Clone, Serialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub reset_ttl_secs: u64,
    /// Largest task list an export may contain
    pub report_max_tasks: usize,
    /// Prefix of the link written by the reset notifier; the token is appended
    pub reset_link_base: String,
    /// Directory for daily log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    /// Root directory of stored task attachments
    pub upload_dir: PathBuf,
    /// Largest accepted attachment, in bytes
    pub max_upload_bytes: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("reset_ttl_secs", &self.reset_ttl_secs)
            .field("report_max_tasks", &self.report_max_tasks)
            .field("reset_link_base", &self.reset_link_base)
            .field("log_dir", &self.log_dir)
            .field("log_format", &self.log_format)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://taskdesk.db".to_string(),
            bind_address: format!("127.0.0.1:{DEFAULT_PORT}"),
            jwt_secret: String::new(),
            session_ttl_secs: 24 * 60 * 60,
            reset_ttl_secs: 60 * 60,
            report_max_tasks: DEFAULT_REPORT_MAX_TASKS,
            reset_link_base: format!("http://127.0.0.1:{DEFAULT_PORT}/password-reset/confirm?token="),
            log_dir: None,
            log_format: LogFormat::Text,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// One configuration layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub jwt_secret: Option<String>,
    pub session_ttl_secs: Option<u64>,
    pub reset_ttl_secs: Option<u64>,
    pub report_max_tasks: Option<usize>,
    pub reset_link_base: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
}

impl PartialConfig {
    /// Read a YAML configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaskdeskError::Io(std::io::Error::other(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            TaskdeskError::configuration(format!(
                "Failed to parse YAML config {}: {e}",
                path.display()
            ))
        })
    }

    /// Read `TASKDESK_*` environment variables
    ///
    /// # Errors
    /// Returns an error if a numeric or enumerated variable does not parse
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env_var("DATABASE_URL"),
            bind_address: env_var("BIND_ADDRESS"),
            jwt_secret: env_var("JWT_SECRET"),
            session_ttl_secs: env_parse("SESSION_TTL_SECS")?,
            reset_ttl_secs: env_parse("RESET_TTL_SECS")?,
            report_max_tasks: env_parse("REPORT_MAX_TASKS")?,
            reset_link_base: env_var("RESET_LINK_BASE"),
            log_dir: env_var("LOG_DIR").map(PathBuf::from),
            log_format: env_var("LOG_FORMAT")
                .map(|v| v.parse::<LogFormat>())
                .transpose()?,
            upload_dir: env_var("UPLOAD_DIR").map(PathBuf::from),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES")?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                TaskdeskError::configuration(format!("Invalid {ENV_PREFIX}{key} '{raw}': {e}"))
            })
        })
        .transpose()
}

impl AppConfig {
    /// Overlay every key `layer` sets
    pub fn merge_with(&mut self, layer: &PartialConfig) {
        let layer = layer.clone();
        if let Some(v) = layer.database_url {
            self.database_url = v;
        }
        if let Some(v) = layer.bind_address {
            self.bind_address = v;
        }
        if let Some(v) = layer.jwt_secret {
            self.jwt_secret = v;
        }
        if let Some(v) = layer.session_ttl_secs {
            self.session_ttl_secs = v;
        }
        if let Some(v) = layer.reset_ttl_secs {
            self.reset_ttl_secs = v;
        }
        if let Some(v) = layer.report_max_tasks {
            self.report_max_tasks = v;
        }
        if let Some(v) = layer.reset_link_base {
            self.reset_link_base = v;
        }
        if let Some(v) = layer.log_dir {
            self.log_dir = Some(v);
        }
        if let Some(v) = layer.log_format {
            self.log_format = v;
        }
        if let Some(v) = layer.upload_dir {
            self.upload_dir = v;
        }
        if let Some(v) = layer.max_upload_bytes {
            self.max_upload_bytes = v;
        }
    }

    /// Check the configuration is usable for serving
    ///
    /// # Errors
    /// Returns a configuration error describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(TaskdeskError::configuration("Database URL cannot be empty"));
        }
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(TaskdeskError::configuration(format!(
                "Bind address '{}' is not a valid socket address",
                self.bind_address
            )));
        }
        if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(TaskdeskError::configuration(format!(
                "JWT secret must be at least {MIN_JWT_SECRET_LENGTH} bytes (set {ENV_PREFIX}JWT_SECRET)"
            )));
        }
        if self.session_ttl_secs == 0 {
            return Err(TaskdeskError::configuration(
                "Session TTL must be greater than 0",
            ));
        }
        if self.reset_ttl_secs == 0 {
            return Err(TaskdeskError::configuration(
                "Password reset TTL must be greater than 0",
            ));
        }
        if self.report_max_tasks == 0 {
            return Err(TaskdeskError::configuration(
                "Report task limit must be greater than 0",
            ));
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(TaskdeskError::configuration(
                "Upload directory cannot be empty",
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(TaskdeskError::configuration(
                "Upload size limit must be greater than 0",
            ));
        }
        Ok(())
    }

    /// A valid configuration backed by an in-memory database
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            ..Self::default()
        }
    }
}
