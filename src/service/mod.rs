//! Service layer: matchmaking, move coordination and message routing.
//!
//! [`Dispatcher`] owns the shared state and is the only entry point used by
//! the transport; [`Matchmaker`] and [`coordinator`] run inside its lock.

pub mod coordinator;
pub mod dispatcher;
pub mod matchmaker;

pub use coordinator::MoveApplied;
pub use dispatcher::Dispatcher;
pub use matchmaker::Matchmaker;
