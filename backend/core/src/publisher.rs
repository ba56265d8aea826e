use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::envelope::Envelope;
use crate::error::RelayError;
use crate::registry::SubscriptionRegistry;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Frames queued on an open connection.
    pub delivered: usize,
    /// Subscribers that closed after the snapshot was taken.
    pub skipped: usize,
    pub failed: usize,
}

/// Fans `MESSAGE` envelopes out to the current subscribers of a channel.
#[derive(Clone)]
pub struct Publisher {
    registry: Arc<SubscriptionRegistry>,
}

impl Publisher {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `payload` to every subscriber of `channel`.
    ///
    /// A channel without subscribers is not an error. Send failures are
    /// logged per recipient and never stop delivery to the others.
    pub fn publish(&self, channel: &str, payload: Option<String>) -> Result<PublishReport, RelayError> {
        let subscribers = self.registry.snapshot(channel);
        if subscribers.is_empty() {
            debug!(channel, "No subscribers for channel");
            return Ok(PublishReport::default());
        }

        let frame = Envelope::message(channel, payload).encode()?;
        let mut report = PublishReport::default();
        for subscriber in &subscribers {
            if !subscriber.is_open() {
                trace!(connection_id = subscriber.id(), channel, "Skipping closed subscriber");
                report.skipped += 1;
                continue;
            }
            match subscriber.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(connection_id = subscriber.id(), channel, error = %e, "Error sending message to connection");
                }
            }
        }

        debug!(
            channel,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "Published message to channel"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Action;
    use crate::traits::mock::MockConnection;

    fn setup() -> (Arc<SubscriptionRegistry>, Publisher) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let publisher = Publisher::new(registry.clone());
        (registry, publisher)
    }

    #[test]
    fn publish_without_subscribers_is_empty_success() {
        let (_registry, publisher) = setup();
        let report = publisher.publish("y", Some("p".into())).unwrap();
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn publish_reaches_every_subscriber_once() {
        let (registry, publisher) = setup();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        let c = MockConnection::new("c");
        registry.subscribe(&a.handle(), "weather").unwrap();
        registry.subscribe(&b.handle(), "weather").unwrap();
        registry.subscribe(&c.handle(), "other").unwrap();

        let report = publisher.publish("weather", Some("sunny".into())).unwrap();

        assert_eq!(report.delivered, 2);
        for conn in [&a, &b] {
            let messages: Vec<_> = conn
                .envelopes()
                .into_iter()
                .filter(|e| e.action == Action::Message)
                .collect();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].channel.as_deref(), Some("weather"));
            assert_eq!(messages[0].payload.as_deref(), Some("sunny"));
            assert!(messages[0].timestamp.is_some());
        }
        assert!(c.envelopes().iter().all(|e| e.action != Action::Message));
    }

    #[test]
    fn failing_recipient_does_not_block_others() {
        let (registry, publisher) = setup();
        let broken = MockConnection::new("broken");
        let healthy = MockConnection::new("healthy");
        registry.subscribe(&broken.handle(), "x").unwrap();
        registry.subscribe(&healthy.handle(), "x").unwrap();
        broken.fail_sends();

        let report = publisher.publish("x", Some("hello".into())).unwrap();

        assert_eq!(report, PublishReport { delivered: 1, skipped: 0, failed: 1 });
        assert_eq!(healthy.envelopes().last().unwrap().action, Action::Message);
    }

    #[test]
    fn closed_subscriber_is_skipped_not_delivered() {
        let (registry, publisher) = setup();
        let gone = MockConnection::new("gone");
        let live = MockConnection::new("live");
        registry.subscribe(&gone.handle(), "x").unwrap();
        registry.subscribe(&live.handle(), "x").unwrap();
        gone.close();

        let report = publisher.publish("x", Some("hello".into())).unwrap();

        assert_eq!(report, PublishReport { delivered: 1, skipped: 1, failed: 0 });
        assert!(gone.envelopes().iter().all(|e| e.action != Action::Message));
    }

    #[test]
    fn preserves_publish_order_per_subscriber() {
        let (registry, publisher) = setup();
        let a = MockConnection::new("a");
        registry.subscribe(&a.handle(), "seq").unwrap();

        for i in 0..10 {
            publisher.publish("seq", Some(i.to_string())).unwrap();
        }

        let payloads: Vec<_> = a
            .envelopes()
            .into_iter()
            .filter(|e| e.action == Action::Message)
            .filter_map(|e| e.payload)
            .collect();
        let expected: Vec<_> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(payloads, expected);
    }
}
