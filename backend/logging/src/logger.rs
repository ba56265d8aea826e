//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional daily-rotated NDJSON
//! files, and environment-based level control.

use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log: `relay.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "relay.log";

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Filter directives used when `RUST_LOG` is unset, e.g. `info` or
    /// `info,relay_core=debug`.
    pub level: String,
    /// Directory for rolling NDJSON files; console only when `None`.
    pub dir: Option<PathBuf>,
    /// JSON console output instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

/// Keeps the background file writer alive; dropping it flushes and stops
/// file logging.
pub struct LoggerGuard {
    _file: Option<WorkerGuard>,
}

/// `RUST_LOG` if set and valid, otherwise the configured directives.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    resolve_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), level)
}

fn resolve_filter(env_directives: Option<&str>, level: &str) -> Result<EnvFilter> {
    if let Some(filter) = env_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(level)?)
}

/// Initialize the global structured logger.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_logger(options: &LoggerOptions) -> Result<LoggerGuard> {
    let env_filter = build_filter(&options.level)?;

    let console_layer = if options.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let (file_layer, file_guard) = match &options.dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(LoggerGuard { _file: file_guard })
}
