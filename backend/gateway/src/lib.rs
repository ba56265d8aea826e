//! Relay gateway: WebSocket transport and HTTP endpoints.
//!
//! Accepts connections on the broker endpoint, enforces the origin policy
//! and feeds every text frame to the relay core.

pub mod connection;
pub mod health_api;
pub mod origin;
pub mod server;
pub mod ws_server;

pub use connection::WsConnection;
pub use origin::OriginPolicy;
pub use server::{Gateway, GatewaySettings, GatewayState, start_server};
