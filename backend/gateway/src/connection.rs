//! `Connection` implementation backed by a WebSocket writer task.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use relay_core::{Connection, RelayError};

/// Frames queued for the writer task.
#[derive(Debug)]
pub enum Outbound {
    Text(String),
    Close { code: u16, reason: &'static str },
}

/// One accepted WebSocket session.
///
/// Sends never wait: frames go into a bounded queue drained by the writer
/// task, and a full queue fails the send for this connection only.
pub struct WsConnection {
    id: String,
    tx: mpsc::Sender<Outbound>,
    open: AtomicBool,
}

impl WsConnection {
    pub fn new(id: String, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            tx,
            open: AtomicBool::new(true),
        }
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Ask the writer to send a close frame and stop.
    pub fn close_with(&self, code: u16, reason: &'static str) {
        if self.tx.try_send(Outbound::Close { code, reason }).is_err() {
            self.mark_closed();
        }
    }
}

impl Connection for WsConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send(&self, frame: String) -> Result<(), RelayError> {
        self.tx.try_send(Outbound::Text(frame)).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::SendBufferFull(self.id.clone()),
            TrySendError::Closed(_) => {
                self.mark_closed();
                RelayError::ConnectionClosed(self.id.clone())
            }
        })
    }
}
