//! Game records and their identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::ConnectionId;
use super::board::{Board, Marker};

/// Game identifier derived from the creation time in Unix nanoseconds.
///
/// Serialized as a decimal string. Uniqueness is enforced by
/// [`super::SessionRegistry::next_game_id`], which never hands out a value
/// twice even if the clock stalls or goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId(i64);

impl GameId {
    /// Wraps a raw nanosecond timestamp.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Identifier for a game created at `at`.
    #[must_use]
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_nanos_opt().unwrap_or_default())
    }

    /// Raw nanosecond value.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// The next identifier in sequence.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for GameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One two-player match.
///
/// Mutated only by the game coordinator while the dispatcher lock is held.
/// Participants are referenced by [`ConnectionId`]; a participant that
/// disconnects stays recorded here.
#[derive(Debug, Clone)]
pub struct Game {
    /// Unique identifier.
    pub id: GameId,
    /// Connection playing [`Marker::X`].
    pub player_x: ConnectionId,
    /// Connection playing [`Marker::O`].
    pub player_o: ConnectionId,
    /// Current grid.
    pub board: Board,
    /// Marker whose move is expected next.
    pub turn: Marker,
    /// Set once a win or draw is reached. Never cleared.
    pub finished: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Creates an unfinished game on an empty board.
    ///
    /// Returns `None` if both roles would go to the same connection.
    #[must_use]
    pub fn new(
        id: GameId,
        player_x: ConnectionId,
        player_o: ConnectionId,
        first_turn: Marker,
    ) -> Option<Self> {
        if player_x == player_o {
            return None;
        }
        Some(Self {
            id,
            player_x,
            player_o,
            board: Board::new(),
            turn: first_turn,
            finished: false,
            created_at: Utc::now(),
        })
    }

    /// Role held by `conn` in this game, if it is a participant.
    #[must_use]
    pub fn role_of(&self, conn: ConnectionId) -> Option<Marker> {
        if conn == self.player_x {
            Some(Marker::X)
        } else if conn == self.player_o {
            Some(Marker::O)
        } else {
            None
        }
    }

    /// Connection holding `role`.
    #[must_use]
    pub const fn player(&self, role: Marker) -> ConnectionId {
        match role {
            Marker::X => self.player_x,
            Marker::O => self.player_o,
        }
    }

    /// Both participants with their roles, `X` first.
    #[must_use]
    pub const fn participants(&self) -> [(ConnectionId, Marker); 2] {
        [(self.player_x, Marker::X), (self.player_o, Marker::O)]
    }
}
