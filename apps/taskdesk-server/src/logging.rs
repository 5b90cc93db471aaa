//! Tracing subscriber setup
//!
//! Logs go to stdout as text or JSON. When a log directory is configured they
//! are also written to a daily-rotated file there.

use std::path::Path;
use taskdesk_core::LogFormat;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "taskdesk=info,taskdesk_core=info,taskdesk_server=info,tower_http=info";
const VERBOSE_FILTER: &str = "taskdesk=debug,taskdesk_core=debug,taskdesk_server=debug,tower_http=debug";

const LOG_FILE_PREFIX: &str = "taskdesk.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    FilterCompilation(String),

    #[error("Failed to create log directory: {0}")]
    Directory(#[from] std::io::Error),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the file writer flushing; hold it until shutdown
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn build_filter(verbose: bool) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .map_err(|e| LoggingError::FilterCompilation(e.to_string())),
        _ => Ok(EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })),
    }
}

fn stdout_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Text => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed(),
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if `RUST_LOG` does not parse, the log directory cannot be
/// created, or a subscriber is already installed
pub fn init(
    format: LogFormat,
    verbose: bool,
    log_dir: Option<&Path>,
) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(verbose)?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer(format));

    let Some(dir) = log_dir else {
        registry
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
        return Ok(LoggingGuard { _file: None });
    };

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    registry
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    Ok(LoggingGuard { _file: Some(guard) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_filter_when_unset() {
        std::env::remove_var("RUST_LOG");
        let filter = build_filter(false).unwrap();
        assert!(filter.to_string().contains("taskdesk=info"));
        let verbose = build_filter(true).unwrap();
        assert!(verbose.to_string().contains("taskdesk=debug"));
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_default() {
        std::env::set_var("RUST_LOG", "warn");
        let filter = build_filter(true).unwrap();
        assert_eq!(filter.to_string(), "warn");
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_invalid_rust_log_rejected() {
        std::env::set_var("RUST_LOG", "taskdesk=notalevel");
        assert!(matches!(
            build_filter(false),
            Err(LoggingError::FilterCompilation(_))
        ));
        std::env::remove_var("RUST_LOG");
    }
}
