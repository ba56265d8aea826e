//! Inbound frame handling.
//!
//! Validation short-circuits in a fixed order: size, decode, action,
//! channel. Every failure is answered with an `ERROR` envelope to the sender
//! and never escapes to the connection task.

use std::sync::Arc;

use tracing::{error, warn};

use crate::envelope::{Action, Envelope};
use crate::error::RelayError;
use crate::publisher::Publisher;
use crate::registry::SubscriptionRegistry;
use crate::traits::{deliver, ConnectionRef};

#[derive(Clone)]
pub struct MessageRouter {
    registry: Arc<SubscriptionRegistry>,
    publisher: Publisher,
    max_message_size: usize,
}

impl MessageRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>, max_message_size: usize) -> Self {
        let publisher = Publisher::new(registry.clone());
        Self {
            registry,
            publisher,
            max_message_size,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Handle one inbound text frame from `conn`.
    pub fn handle_text(&self, conn: &ConnectionRef, frame: &str) {
        if let Err(e) = self.route(conn, frame) {
            match &e {
                RelayError::FrameTooLarge { .. }
                | RelayError::MissingChannel
                | RelayError::UnknownAction(_) => {
                    warn!(connection_id = conn.id(), "{e}");
                }
                _ => {
                    error!(connection_id = conn.id(), error = %e, "Error handling message");
                }
            }
            self.send_error(conn, &e.to_string());
        }
    }

    /// Validate and dispatch a frame, returning the failure instead of
    /// reporting it.
    pub fn route(&self, conn: &ConnectionRef, frame: &str) -> Result<(), RelayError> {
        if frame.len() > self.max_message_size {
            return Err(RelayError::FrameTooLarge {
                limit: self.max_message_size,
            });
        }

        let envelope = Envelope::decode(frame)?;
        let action = envelope.action;
        if !action.requires_channel() {
            return Err(RelayError::UnknownAction(action));
        }
        let channel = envelope.channel_name().ok_or(RelayError::MissingChannel)?;

        match action {
            Action::Subscribe => {
                self.registry
                    .subscribe(conn, channel)
                    .map_err(RelayError::handling)?;
            }
            Action::Unsubscribe => {
                self.registry
                    .unsubscribe(conn, channel)
                    .map_err(RelayError::handling)?;
            }
            Action::Send => {
                self.publisher.publish(channel, envelope.payload.clone())?;
            }
            other => return Err(RelayError::UnknownAction(other)),
        }
        Ok(())
    }

    /// Best-effort `ERROR` notification; a failure here is only logged.
    fn send_error(&self, conn: &ConnectionRef, text: &str) {
        if let Err(e) = deliver(conn.as_ref(), &Envelope::error(text)) {
            error!(connection_id = conn.id(), error = %e, "The error message couldn't be sent");
        }
    }
}
