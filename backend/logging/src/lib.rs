//! Structured logging setup for the relay.
//!
//! Console output plus optional rolling NDJSON files, with `RUST_LOG`
//! taking precedence over the configured level.

pub mod logger;

pub use logger::{LoggerGuard, LoggerOptions, build_filter, init_logger};
