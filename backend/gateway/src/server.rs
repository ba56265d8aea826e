//! Gateway HTTP server.
//!
//! Wires the relay core to axum: the WebSocket endpoint, health and stats
//! routes, and the background sweeper.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use relay_config::RelayConfig;
use relay_core::{MessageRouter, StaleConnectionSweeper, SubscriptionRegistry};

use crate::health_api;
use crate::origin::OriginPolicy;
use crate::ws_server;

/// Everything the gateway needs from configuration.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub addr: SocketAddr,
    pub ws_path: String,
    pub allowed_origins: String,
    pub send_buffer: usize,
    pub max_message_size: usize,
    pub sweep_interval: Duration,
}

impl GatewaySettings {
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self {
            addr: config.bind_addr()?,
            ws_path: config.ws_path().to_string(),
            allowed_origins: config.allowed_origins().to_string(),
            send_buffer: config.send_buffer(),
            max_message_size: config.max_message_size(),
            sweep_interval: config.sweep_interval(),
        })
    }
}

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub router: MessageRouter,
    pub origins: Arc<OriginPolicy>,
    pub send_buffer: usize,
    pub started_at: Instant,
}

pub struct Gateway {
    state: GatewayState,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let origins = OriginPolicy::parse(&settings.allowed_origins)
            .with_context(|| format!("Invalid allowed origins '{}'", settings.allowed_origins))?;
        let registry = Arc::new(SubscriptionRegistry::new());
        let state = GatewayState {
            router: MessageRouter::new(registry, settings.max_message_size),
            origins: Arc::new(origins),
            send_buffer: settings.send_buffer.max(1),
            started_at: Instant::now(),
        };
        Ok(Self { state, settings })
    }

    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        self.state.router.registry().clone()
    }

    pub fn app(&self) -> Router {
        Router::new()
            .route(&self.settings.ws_path, get(ws_server::ws_handler))
            .route("/api/health", get(health_api::get_health))
            .route("/api/stats", get(health_api::get_stats))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper =
            StaleConnectionSweeper::new(self.registry(), self.settings.sweep_interval).spawn();

        info!(
            addr = %listener.local_addr()?,
            path = %self.settings.ws_path,
            max_message_size = self.settings.max_message_size,
            "Relay gateway listening"
        );
        let result = axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        info!("Relay gateway stopped");
        result.context("Gateway server failed")
    }
}

/// Binds the configured address and serves until Ctrl-C.
#[instrument(skip(settings), fields(addr = %settings.addr))]
pub async fn start_server(settings: GatewaySettings) -> Result<()> {
    let listener = TcpListener::bind(settings.addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.addr))?;
    Gateway::new(settings)?.serve(listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
