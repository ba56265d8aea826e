use std::sync::Arc;

use tracing::trace;

use crate::envelope::Envelope;
use crate::error::RelayError;

/// One client session as seen by the relay core.
///
/// Implemented by the transport layer. `send` must never block: a slow or
/// dead peer is reported through an error rather than by stalling the
/// caller, which may be fanning out to many other connections.
pub trait Connection: Send + Sync + 'static {
    /// Process-unique id, stable for the lifetime of the physical connection.
    fn id(&self) -> &str;

    /// Whether the underlying transport is still usable.
    fn is_open(&self) -> bool;

    /// Queue one text frame for delivery.
    fn send(&self, frame: String) -> Result<(), RelayError>;
}

/// Shared handle to a connection.
pub type ConnectionRef = Arc<dyn Connection>;

/// Encode and send an envelope. Closed connections are skipped silently.
pub fn deliver(conn: &dyn Connection, envelope: &Envelope) -> Result<(), RelayError> {
    send_frame(conn, envelope.encode()?)
}

/// Send an already encoded frame. Closed connections are skipped silently.
fn send_frame(conn: &dyn Connection, frame: String) -> Result<(), RelayError> {
    if !conn.is_open() {
        trace!(connection_id = conn.id(), "Skipping send to closed connection");
        return Ok(());
    }
    conn.send(frame)
}
