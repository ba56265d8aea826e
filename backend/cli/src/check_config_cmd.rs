//! CLI Check-Config Command
//!
//! Loads a config file the same way `serve` does and prints the validation
//! report instead of starting the server.

use std::path::Path;

use anyhow::Result;

/// Returns whether the config is free of errors.
pub async fn run(path: &Path) -> Result<bool> {
    println!("Checking {}", path.display());

    let (config, report) = relay_config::load_with_report(path).await?;

    for warning in &report.warnings {
        println!("  warning  {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  error    {}: {}", error.path, error.message);
    }

    if report.is_valid() {
        println!("\nEffective configuration:\n");
        println!("{}", serde_json::to_string_pretty(&config)?);
        println!("\nOK");
    } else {
        println!("\n{} error(s)", report.errors.len());
    }
    Ok(report.is_valid())
}
