//! In-memory publish/subscribe relay core.
//!
//! Connections declare interest in named channels and publish to them; the
//! relay fans every published message out to the channel's current
//! subscribers. Nothing is persisted.

pub mod envelope;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod router;
pub mod sweeper;
pub mod traits;

pub use envelope::{Action, Envelope};
pub use error::RelayError;
pub use publisher::{PublishReport, Publisher};
pub use registry::SubscriptionRegistry;
pub use router::MessageRouter;
pub use sweeper::{StaleConnectionSweeper, SweepReport};
pub use traits::{deliver, Connection, ConnectionRef};
