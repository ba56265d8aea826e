//! Periodic eviction of connections that died without a close event.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::registry::SubscriptionRegistry;

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections removed from the registry.
    pub connections: usize,
    /// Channel memberships those connections held.
    pub subscriptions: usize,
}

/// Shortest accepted sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

pub struct StaleConnectionSweeper {
    registry: Arc<SubscriptionRegistry>,
    interval: Duration,
}

impl StaleConnectionSweeper {
    pub fn new(registry: Arc<SubscriptionRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            interval: interval.max(MIN_SWEEP_INTERVAL),
        }
    }

    /// Run one pass over the registry.
    ///
    /// Candidates are gathered without holding any lock across the pass;
    /// each one is then evicted only if it still reports closed at removal
    /// time.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for id in self.registry.closed_candidates() {
            if let Some(subscriptions) = self.registry.evict_if_closed(&id) {
                report.connections += 1;
                report.subscriptions += subscriptions;
                debug!(connection_id = %id, subscriptions, "Evicted inactive connection");
            }
        }
        if report.connections > 0 {
            debug!(
                connections = report.connections,
                subscriptions = report.subscriptions,
                "Cleaned up {} inactive connections",
                report.connections
            );
        }
        report
    }

    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first pass runs one full interval after start; a slow pass delays
    /// the next one instead of causing a burst.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval_ms = self.interval.as_millis() as u64, "Stale-connection sweeper started");
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
