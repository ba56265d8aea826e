//! Config defaults: applies the documented default values to parsed config.

use crate::schema::{CleanupConfig, LoggingConfig, MessageConfig, RelayConfig, ServerConfig};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

pub const DEFAULT_WS_PATH: &str = "/ws/broker";

/// Any origin may open a connection.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "*";

pub const DEFAULT_SEND_BUFFER: usize = 256;

/// Maximum inbound frame size in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65_536;

/// Stale-connection sweep period (five minutes).
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 300_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: RelayConfig) -> RelayConfig {
    let config = apply_server_defaults(config);
    let config = apply_message_defaults(config);
    let config = apply_cleanup_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: RelayConfig) -> RelayConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.path.get_or_insert_with(|| DEFAULT_WS_PATH.to_string());
    server
        .allowed_origins
        .get_or_insert_with(|| DEFAULT_ALLOWED_ORIGINS.to_string());
    server.send_buffer.get_or_insert(DEFAULT_SEND_BUFFER);
    config
}

fn apply_message_defaults(mut config: RelayConfig) -> RelayConfig {
    let message = config.message.get_or_insert_with(MessageConfig::default);
    message.max_size.get_or_insert(DEFAULT_MAX_MESSAGE_SIZE);
    config
}

fn apply_cleanup_defaults(mut config: RelayConfig) -> RelayConfig {
    let cleanup = config.cleanup.get_or_insert_with(CleanupConfig::default);
    cleanup.interval_ms.get_or_insert(DEFAULT_CLEANUP_INTERVAL_MS);
    config
}

fn apply_logging_defaults(mut config: RelayConfig) -> RelayConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
