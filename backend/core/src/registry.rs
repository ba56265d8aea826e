//! Subscription registry.
//!
//! Bidirectional index between channels and connections:
//!
//! - forward: `channel -> {connection id -> handle}`, read on every publish
//! - reverse: `connection id -> {channels}`, walked on disconnect
//!
//! Both maps are sharded `DashMap`s, so unrelated channels and connections
//! never contend on the same lock. Every mutation takes the reverse entry of
//! the affected connection first and only then touches forward entries;
//! nothing holds a forward entry while acquiring a reverse one. A connection
//! id is therefore in a channel's forward set exactly when that channel is in
//! the connection's reverse set, whenever no reverse entry is locked.
//!
//! Channels exist only while they have subscribers: the last removal from a
//! forward set removes the key under the same shard lock.

use std::collections::{HashMap, HashSet};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::RelayError;
use crate::traits::{deliver, ConnectionRef};

struct ConnectionEntry {
    handle: ConnectionRef,
    channels: HashSet<String>,
}

impl ConnectionEntry {
    fn new(handle: ConnectionRef) -> Self {
        Self {
            handle,
            channels: HashSet::new(),
        }
    }
}

/// Thread-safe channel/connection index.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: DashMap<String, HashMap<String, ConnectionRef>>,
    connections: DashMap<String, ConnectionEntry>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened connection with no subscriptions.
    /// Calling it again for a known id has no effect.
    pub fn on_connect(&self, conn: &ConnectionRef) {
        let id = conn.id();
        if let Entry::Vacant(vacant) = self.connections.entry(id.to_string()) {
            vacant.insert(ConnectionEntry::new(conn.clone()));
            debug!(connection_id = id, "Connection established");
        }
    }

    /// Subscribe `conn` to `channel` and acknowledge with `SUBSCRIBED`.
    ///
    /// Returns `Ok(false)` without sending anything when the connection was
    /// already subscribed or is no longer open. An unknown connection is
    /// registered on the fly.
    ///
    /// Liveness is read under the reverse entry lock: once a connection is
    /// marked closed and torn down, a late subscribe cannot bring it back.
    pub fn subscribe(&self, conn: &ConnectionRef, channel: &str) -> Result<bool, RelayError> {
        let id = conn.id();
        {
            let entry = self.connections.entry(id.to_string());
            if !conn.is_open() {
                debug!(connection_id = id, channel, "Ignoring subscribe from closed connection");
                return Ok(false);
            }
            let mut entry = entry.or_insert_with(|| ConnectionEntry::new(conn.clone()));
            if entry.channels.contains(channel) {
                debug!(connection_id = id, channel, "Connection is already subscribed");
                return Ok(false);
            }
            self.channels
                .entry(channel.to_string())
                .or_default()
                .insert(id.to_string(), conn.clone());
            entry.channels.insert(channel.to_string());
        }
        debug!(connection_id = id, channel, "Connection subscribed to channel");

        deliver(conn.as_ref(), &Envelope::subscribed(channel))?;
        Ok(true)
    }

    /// Remove `conn` from `channel` and acknowledge with `UNSUBSCRIBED`.
    ///
    /// The acknowledgment is sent even if the connection was never
    /// subscribed.
    pub fn unsubscribe(&self, conn: &ConnectionRef, channel: &str) -> Result<(), RelayError> {
        let id = conn.id();
        match self.connections.get_mut(id) {
            Some(mut entry) => {
                entry.channels.remove(channel);
                self.detach(channel, id);
            }
            None => {
                self.detach(channel, id);
            }
        }
        debug!(connection_id = id, channel, "Connection unsubscribed from channel");

        deliver(conn.as_ref(), &Envelope::unsubscribed(channel))
    }

    /// Tear down every subscription held by `connection_id` and forget it.
    /// Returns the number of channels the connection was subscribed to.
    pub fn disconnect(&self, connection_id: &str) -> usize {
        let removed = match self.connections.entry(connection_id.to_string()) {
            Entry::Occupied(entry) => {
                for channel in &entry.get().channels {
                    self.detach(channel, connection_id);
                }
                entry.remove().channels.len()
            }
            Entry::Vacant(_) => 0,
        };
        debug!(connection_id, channels = removed, "Connection closed");
        removed
    }

    /// Evict `connection_id` if its transport reports closed.
    ///
    /// Liveness is read while the connection's reverse entry is locked, so a
    /// connection that is open at this point is never evicted regardless of
    /// when the caller observed it closed.
    pub fn evict_if_closed(&self, connection_id: &str) -> Option<usize> {
        match self.connections.entry(connection_id.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().handle.is_open() {
                    return None;
                }
                for channel in &entry.get().channels {
                    self.detach(channel, connection_id);
                }
                Some(entry.remove().channels.len())
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Ids of connections that currently report closed, gathered from both
    /// indices. The result is advisory: callers must re-check through
    /// [`evict_if_closed`](Self::evict_if_closed).
    pub fn closed_candidates(&self) -> HashSet<String> {
        let mut candidates = HashSet::new();
        for subscribers in self.channels.iter() {
            candidates.extend(
                subscribers
                    .values()
                    .filter(|conn| !conn.is_open())
                    .map(|conn| conn.id().to_string()),
            );
        }
        for entry in self.connections.iter() {
            if !entry.handle.is_open() {
                candidates.insert(entry.key().clone());
            }
        }
        candidates
    }

    /// Current subscribers of `channel`, copied out so fan-out runs without
    /// holding any registry lock. Empty when the channel does not exist.
    pub fn snapshot(&self, channel: &str) -> Vec<ConnectionRef> {
        self.channels
            .get(channel)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Channels held by a connection, `None` if the id is unknown.
    pub fn channels_of(&self, connection_id: &str) -> Option<HashSet<String>> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.channels.clone())
    }

    /// Subscriber ids of a channel, `None` if the channel does not exist.
    pub fn subscriber_ids(&self, channel: &str) -> Option<HashSet<String>> {
        self.channels
            .get(channel)
            .map(|subscribers| subscribers.keys().cloned().collect())
    }

    pub fn is_subscribed(&self, connection_id: &str, channel: &str) -> bool {
        self.connections
            .get(connection_id)
            .is_some_and(|entry| entry.channels.contains(channel))
    }

    /// Drop `connection_id` from the forward set of `channel`, removing the
    /// channel when it becomes empty.
    fn detach(&self, channel: &str, connection_id: &str) -> bool {
        match self.channels.entry(channel.to_string()) {
            Entry::Occupied(mut subscribers) => {
                let removed = subscribers.get_mut().remove(connection_id).is_some();
                if subscribers.get().is_empty() {
                    subscribers.remove();
                    debug!(channel, "Channel has no subscribers left, removed");
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::envelope::Action;
    use crate::traits::mock::MockConnection;

    /// Both directions agree and no channel is left empty.
    fn assert_consistent(registry: &SubscriptionRegistry) {
        for channel in registry.channels.iter() {
            assert!(!channel.is_empty(), "empty channel {} persisted", channel.key());
            for id in channel.keys() {
                assert!(
                    registry.is_subscribed(id, channel.key()),
                    "{id} in forward set of {} but not in reverse index",
                    channel.key()
                );
            }
        }
        for entry in registry.connections.iter() {
            for channel in &entry.channels {
                let forward = registry.subscriber_ids(channel).unwrap_or_default();
                assert!(
                    forward.contains(entry.key()),
                    "{channel} in reverse set of {} but not in forward index",
                    entry.key()
                );
            }
        }
    }

    #[test]
    fn on_connect_registers_empty_channel_set() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());
        registry.on_connect(&a.handle());

        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.channels_of("a"), Some(HashSet::new()));
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn subscribe_updates_both_indices_and_acknowledges() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());

        assert!(registry.subscribe(&a.handle(), "weather").unwrap());

        assert!(registry.is_subscribed("a", "weather"));
        assert!(registry.subscriber_ids("weather").unwrap().contains("a"));
        let sent = a.envelopes();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, Action::Subscribed);
        assert_eq!(sent[0].channel.as_deref(), Some("weather"));
        assert_consistent(&registry);
    }

    #[test]
    fn subscribe_twice_is_a_noop() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());

        assert!(registry.subscribe(&a.handle(), "x").unwrap());
        assert!(!registry.subscribe(&a.handle(), "x").unwrap());

        assert_eq!(registry.subscriber_ids("x").unwrap().len(), 1);
        assert_eq!(registry.channels_of("a").unwrap().len(), 1);
        assert_eq!(a.envelopes().len(), 1);
    }

    #[test]
    fn subscribe_registers_unknown_connection() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");

        registry.subscribe(&a.handle(), "x").unwrap();

        assert_eq!(registry.connection_count(), 1);
        assert_consistent(&registry);
    }

    #[test]
    fn subscribe_after_teardown_does_not_resurrect_connection() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());
        a.close();
        registry.disconnect("a");

        assert!(!registry.subscribe(&a.handle(), "x").unwrap());

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.channel_count(), 0);
        assert!(a.envelopes().is_empty());
    }

    #[test]
    fn subscribe_from_closed_known_connection_is_ignored() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());
        a.close();

        assert!(!registry.subscribe(&a.handle(), "x").unwrap());

        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.channels_of("a"), Some(HashSet::new()));
        assert_consistent(&registry);
    }

    #[test]
    fn unsubscribe_prunes_last_subscriber() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());
        registry.subscribe(&a.handle(), "x").unwrap();

        registry.unsubscribe(&a.handle(), "x").unwrap();

        assert!(!registry.is_subscribed("a", "x"));
        assert_eq!(registry.subscriber_ids("x"), None);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.channels_of("a"), Some(HashSet::new()));
        assert_eq!(a.envelopes().last().unwrap().action, Action::Unsubscribed);
    }

    #[test]
    fn unsubscribe_keeps_other_subscribers() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        registry.subscribe(&a.handle(), "x").unwrap();
        registry.subscribe(&b.handle(), "x").unwrap();

        registry.unsubscribe(&a.handle(), "x").unwrap();

        assert_eq!(
            registry.subscriber_ids("x").unwrap(),
            HashSet::from(["b".to_string()])
        );
        assert_consistent(&registry);
    }

    #[test]
    fn unsubscribe_without_subscription_still_acknowledges() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.on_connect(&a.handle());

        registry.unsubscribe(&a.handle(), "never").unwrap();

        let sent = a.envelopes();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, Action::Unsubscribed);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn disconnect_clears_both_indices() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        let b = MockConnection::new("b");
        registry.subscribe(&a.handle(), "x").unwrap();
        registry.subscribe(&a.handle(), "y").unwrap();
        registry.subscribe(&b.handle(), "y").unwrap();

        assert_eq!(registry.disconnect("a"), 2);

        assert_eq!(registry.channels_of("a"), None);
        assert_eq!(registry.subscriber_ids("x"), None);
        assert_eq!(
            registry.subscriber_ids("y").unwrap(),
            HashSet::from(["b".to_string()])
        );
        assert_consistent(&registry);
    }

    #[test]
    fn disconnect_unknown_connection_is_harmless() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.disconnect("ghost"), 0);
    }

    #[test]
    fn snapshot_of_missing_channel_is_empty() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.snapshot("nobody").is_empty());
    }

    #[test]
    fn evict_if_closed_spares_open_connections() {
        let registry = SubscriptionRegistry::new();
        let a = MockConnection::new("a");
        registry.subscribe(&a.handle(), "x").unwrap();

        assert_eq!(registry.evict_if_closed("a"), None);
        a.close();
        assert_eq!(registry.evict_if_closed("a"), Some(1));
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn concurrent_mutation_preserves_invariants() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let conns: Vec<_> = (0..8)
            .map(|i| MockConnection::new(&format!("c{i}")))
            .collect();

        std::thread::scope(|scope| {
            for (i, conn) in conns.iter().enumerate() {
                let registry = registry.clone();
                let handle = conn.handle();
                scope.spawn(move || {
                    registry.on_connect(&handle);
                    for round in 0..200 {
                        let channel = format!("ch{}", (round + i) % 5);
                        registry.subscribe(&handle, &channel).unwrap();
                        if round % 3 == 0 {
                            registry.unsubscribe(&handle, &channel).unwrap();
                        }
                        if round % 50 == 49 {
                            registry.disconnect(handle.id());
                            registry.on_connect(&handle);
                        }
                    }
                });
            }
        });

        assert_consistent(&registry);
        assert_eq!(registry.connection_count(), conns.len());
    }
}
