//! Relay configuration schema.
//!
//! Every field is optional in the file; [`crate::apply_all_defaults`] fills
//! the gaps and the accessor methods fall back to the same defaults, so a
//! missing file and an empty file behave identically.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ALLOWED_ORIGINS, DEFAULT_BIND, DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SEND_BUFFER, DEFAULT_WS_PATH,
};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Transport endpoint settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Inbound frame limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageConfig>,

    /// Stale-connection sweep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// WebSocket endpoint path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `*` or a comma-separated list of origins (`*` allowed as a wildcard segment).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<String>,
    /// Outbound frames queued per connection before sends start failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_buffer: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageConfig {
    /// Maximum inbound frame size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling NDJSON log files; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit JSON on the console instead of human-readable lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl RelayConfig {
    pub fn bind(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address '{}': {e}", self.bind()))
    }

    pub fn ws_path(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.path.as_deref())
            .unwrap_or(DEFAULT_WS_PATH)
    }

    pub fn allowed_origins(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.allowed_origins.as_deref())
            .unwrap_or(DEFAULT_ALLOWED_ORIGINS)
    }

    pub fn send_buffer(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.send_buffer)
            .unwrap_or(DEFAULT_SEND_BUFFER)
    }

    pub fn max_message_size(&self) -> usize {
        self.message
            .as_ref()
            .and_then(|m| m.max_size)
            .unwrap_or(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(
            self.cleanup
                .as_ref()
                .and_then(|c| c.interval_ms)
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_MS),
        )
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .map(PathBuf::from)
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
server:
  bind: "127.0.0.1:9000"
  path: /ws/relay
  allowedOrigins: "https://app.example.com"
message:
  maxSize: 1024
cleanup:
  intervalMs: 1500
"#;
        let cfg: RelayConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.bind(), "127.0.0.1:9000");
        assert_eq!(cfg.ws_path(), "/ws/relay");
        assert_eq!(cfg.allowed_origins(), "https://app.example.com");
        assert_eq!(cfg.max_message_size(), 1024);
        assert_eq!(cfg.sweep_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn accessors_fall_back_to_defaults() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.ws_path(), "/ws/broker");
        assert_eq!(cfg.allowed_origins(), "*");
        assert_eq!(cfg.max_message_size(), 65_536);
        assert_eq!(cfg.sweep_interval(), Duration::from_millis(300_000));
        assert!(!cfg.log_json());
        assert!(cfg.bind_addr().is_ok());
    }
}
