//! Domain layer: board engine, sessions, games and the registry that owns
//! them.
//!
//! Nothing here locks or performs network I/O. The registry's send
//! primitive only enqueues onto per-connection queues.

pub mod board;
pub mod connection_id;
pub mod game;
pub mod registry;
pub mod session;

pub use board::{Board, Cell, Marker, Outcome, check_outcome};
pub use connection_id::ConnectionId;
pub use game::{Game, GameId};
pub use registry::{RegistryStats, SessionRegistry};
pub use session::Session;
