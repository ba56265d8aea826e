//! `relay-config` — relay runtime configuration management.
//!
//! Provides:
//! - Typed config schema (server endpoint, frame limits, sweep, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{contains_env_var_reference, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw_config};
pub use schema::RelayConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, apply env substitution, apply defaults and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Warnings
/// are logged; any validation error aborts loading.
pub async fn load_and_prepare(path: &Path) -> Result<RelayConfig> {
    let (config, report) = load_with_report(path).await?;
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        bail!("{} configuration error(s) in {}", report.errors.len(), path.display());
    }
    Ok(config)
}

/// Load and prepare a config, returning the validation report to the caller
/// instead of acting on it.
pub async fn load_with_report(path: &Path) -> Result<(RelayConfig, ValidationReport)> {
    let raw = load_raw_config(path).await?;
    let config = prepare(&raw)?;
    let report = validate(&config);
    Ok((config, report))
}

/// Env substitution, typed decoding and defaults for an already parsed tree.
pub fn prepare(raw: &Value) -> Result<RelayConfig> {
    let value = resolve_env_vars(raw).context("Failed to resolve env vars in config")?;
    let config: RelayConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    Ok(apply_all_defaults(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_file_with_defaults_and_env() {
        let dir = std::env::temp_dir().join(format!("relay-config-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        std::env::set_var("RELAY_TEST_ORIGIN", "https://example.org");
        tokio::fs::write(
            &path,
            "server:\n  allowedOrigins: \"${RELAY_TEST_ORIGIN}\"\nmessage:\n  maxSize: 128\n",
        )
        .await
        .unwrap();

        let config = load_and_prepare(&path).await.unwrap();

        assert_eq!(config.allowed_origins(), "https://example.org");
        assert_eq!(config.max_message_size(), 128);
        assert_eq!(config.ws_path(), "/ws/broker");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let dir = std::env::temp_dir().join(format!("relay-config-bad-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = config_file_path(&dir);
        tokio::fs::write(&path, "cleanup:\n  intervalMs: 0\n").await.unwrap();

        assert!(load_and_prepare(&path).await.is_err());
        let (_, report) = load_with_report(&path).await.unwrap();
        assert_eq!(report.errors[0].path, "cleanup.intervalMs");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn empty_tree_prepares_to_defaults() {
        let config = prepare(&serde_json::json!({})).unwrap();
        assert_eq!(config, apply_all_defaults(RelayConfig::default()));
    }
}
