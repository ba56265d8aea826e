use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Actions carried by an [`Envelope`].
///
/// `Subscribe`, `Unsubscribe` and `Send` travel client → relay; the rest are
/// only ever emitted by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Subscribe,
    Unsubscribe,
    Send,
    Subscribed,
    Unsubscribed,
    Message,
    Error,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Subscribe => "SUBSCRIBE",
            Action::Unsubscribe => "UNSUBSCRIBE",
            Action::Send => "SEND",
            Action::Subscribed => "SUBSCRIBED",
            Action::Unsubscribed => "UNSUBSCRIBED",
            Action::Message => "MESSAGE",
            Action::Error => "ERROR",
        }
    }

    /// Whether a client is allowed to send this action.
    pub fn is_inbound(&self) -> bool {
        matches!(self, Action::Subscribe | Action::Unsubscribe | Action::Send)
    }

    /// Whether the action is meaningless without a channel name.
    pub fn requires_channel(&self) -> bool {
        self.is_inbound()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit exchanged in both directions, one JSON object per text frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub action: Action,
    pub channel: Option<String>,
    pub payload: Option<String>,
    /// Epoch milliseconds, set by the relay on every outbound envelope.
    pub timestamp: Option<i64>,
}

impl Envelope {
    fn outbound(action: Action, channel: Option<String>, payload: Option<String>) -> Self {
        Self {
            action,
            channel,
            payload,
            timestamp: Some(now_millis()),
        }
    }

    pub fn subscribed(channel: &str) -> Self {
        Self::outbound(
            Action::Subscribed,
            Some(channel.to_string()),
            Some(format!("Subscribed to channel: {channel}")),
        )
    }

    pub fn unsubscribed(channel: &str) -> Self {
        Self::outbound(
            Action::Unsubscribed,
            Some(channel.to_string()),
            Some(format!("Unsubscribed from channel: {channel}")),
        )
    }

    pub fn message(channel: &str, payload: Option<String>) -> Self {
        Self::outbound(Action::Message, Some(channel.to_string()), payload)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::outbound(Action::Error, None, Some(text.into()))
    }

    /// Parse one inbound text frame. Any inbound `timestamp` is discarded.
    pub fn decode(frame: &str) -> Result<Self, RelayError> {
        let mut envelope: Envelope =
            serde_json::from_str(frame).map_err(|e| RelayError::Malformed(e.to_string()))?;
        envelope.timestamp = None;
        Ok(envelope)
    }

    pub fn encode(&self) -> Result<String, RelayError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The channel name, if present and not blank.
    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
