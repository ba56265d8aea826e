//! Config validation: checks with user-friendly error messages.

use std::net::SocketAddr;

use thiserror::Error;

use crate::schema::RelayConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &RelayConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_message(config, &mut report);
    validate_cleanup(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &RelayConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(bind) = &server.bind {
        if bind.parse::<SocketAddr>().is_err() {
            report.error("server.bind", format!("'{bind}' is not a valid socket address"));
        }
    }
    if let Some(path) = &server.path {
        if !path.starts_with('/') {
            report.error("server.path", "Endpoint path must start with '/'");
        }
    }
    if let Some(origins) = &server.allowed_origins {
        if origins.split(',').all(|o| o.trim().is_empty()) {
            report.error("server.allowedOrigins", "At least one origin (or '*') is required");
        }
    }
    if server.send_buffer == Some(0) {
        report.error("server.sendBuffer", "sendBuffer must be >= 1");
    }
}

fn validate_message(config: &RelayConfig, report: &mut ValidationReport) {
    let Some(message) = &config.message else { return };
    if message.max_size == Some(0) {
        report.error("message.maxSize", "maxSize must be > 0");
    }
}

fn validate_cleanup(config: &RelayConfig, report: &mut ValidationReport) {
    let Some(interval) = config.cleanup.as_ref().and_then(|c| c.interval_ms) else {
        return;
    };
    if interval == 0 {
        report.error("cleanup.intervalMs", "intervalMs must be > 0");
    } else if interval < 1000 {
        report.warn(
            "cleanup.intervalMs",
            format!("Sweeping every {interval}ms scans the whole registry very often"),
        );
    }
}

fn validate_logging(config: &RelayConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    let known = ["trace", "debug", "info", "warn", "error", "off"];
    let plain = !level.contains('=') && !level.contains(',');
    if plain && !known.contains(&level.to_ascii_lowercase().as_str()) {
        report.warn(
            "logging.level",
            format!("Unknown level '{level}'. Use one of {}", known.join(", ")),
        );
    }
}
