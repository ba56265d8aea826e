mod check_config_cmd;
mod status_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use relay_config::{config_dir, config_file_path, RelayConfig};
use relay_gateway::GatewaySettings;
use relay_logging::{init_logger, LoggerOptions};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "In-memory publish/subscribe relay over WebSocket")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Config file (defaults to $RELAY_CONFIG_DIR/config.yaml or ~/.relay/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the bind address, e.g. 127.0.0.1:9000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Validate a config file and print the report
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query a running relay for health and registry stats
    Status {
        /// Base HTTP URL of the relay
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let path = config.unwrap_or_else(|| config_file_path(&config_dir()));
            let mut config = relay_config::load_and_prepare(&path).await?;
            if let Some(bind) = bind {
                config.server.get_or_insert_with(Default::default).bind = Some(bind);
            }
            run_server(config).await?;
        }
        Commands::CheckConfig { config } => {
            let path = config.unwrap_or_else(|| config_file_path(&config_dir()));
            let valid = check_config_cmd::run(&path).await?;
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Status { url } => status_cmd::run(&url).await?,
    }

    Ok(())
}

async fn run_server(config: RelayConfig) -> Result<()> {
    // Keep the guard alive for the whole run so file logs are flushed.
    let _logger = init_logger(&LoggerOptions {
        level: config.log_level().to_string(),
        dir: config.log_dir(),
        json: config.log_json(),
    })?;

    let settings = GatewaySettings::from_config(&config)?;
    info!(
        bind = %settings.addr,
        path = %settings.ws_path,
        allowed_origins = %settings.allowed_origins,
        sweep_interval_ms = settings.sweep_interval.as_millis() as u64,
        "Starting relay"
    );

    relay_gateway::start_server(settings).await
}
