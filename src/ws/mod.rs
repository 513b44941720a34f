//! WebSocket layer: upgrade handler, per-connection loops, wire messages
//! and outbound queues.
//!
//! The endpoint at `/ws` carries the whole game protocol.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod outbound;

pub use messages::{ClientMessage, ServerMessage};
pub use outbound::{ConnectionHandle, Outbound};
