//! Health and registry statistics endpoints.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub channels: usize,
    pub connections: usize,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}

/// Handler for `GET /api/stats`
pub async fn get_stats(State(state): State<GatewayState>) -> Json<StatsReport> {
    let registry = state.router.registry();
    Json(StatsReport {
        channels: registry.channel_count(),
        connections: registry.connection_count(),
    })
}
