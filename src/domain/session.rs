//! Server-side state for one connected client.

use chrono::{DateTime, Utc};

use super::{ConnectionId, GameId};
use crate::ws::ConnectionHandle;

/// One live client connection.
///
/// Owned by [`super::SessionRegistry`] from connection until disconnect or
/// explicit leave.
#[derive(Debug)]
pub struct Session {
    /// Outbound side of the connection; the only way to reach the client.
    pub handle: ConnectionHandle,
    /// Self-reported display name, empty until a `join` arrives.
    pub name: String,
    /// Game this session was last paired into. Lookup only.
    pub game: Option<GameId>,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
    /// Registration order, used to pick matchmaking candidates.
    pub seq: u64,
}

impl Session {
    /// Creates an unnamed, unmatched session.
    #[must_use]
    pub fn new(handle: ConnectionHandle, seq: u64) -> Self {
        Self {
            handle,
            name: String::new(),
            game: None,
            connected_at: Utc::now(),
            seq,
        }
    }

    /// Registry key of this session.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }
}
