//! Error types for every layer of the server.
//!
//! | Type             | Raised by                 | Handling                          |
//! |------------------|---------------------------|-----------------------------------|
//! | [`ProtocolError`] | inbound message decoding  | logged, message dropped           |
//! | [`GameError`]     | game coordinator          | `error` notification to sender    |
//! | [`SendError`]     | outbound queue            | logged, delivery abandoned        |
//! | [`RegistryError`] | session registry          | connection refused                |
//! | [`ConfigError`]   | startup                   | fatal before serving              |
//!
//! None of the first four ever terminates the process or affects a session
//! other than the one involved.

use crate::domain::ConnectionId;

/// An inbound frame that could not be turned into a client message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The outer `{"type", "data"}` envelope did not decode.
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The envelope carried a `type` tag with no handler.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The tag was recognized but its `data` payload was not.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Message tag whose payload failed.
        kind: &'static str,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A binary frame did not contain UTF-8 text.
    #[error("binary frame is not valid UTF-8")]
    NotUtf8,
}

/// A game-rule violation reported back to the offending client.
///
/// The `Display` output is the exact text sent in the `error`
/// notification, so variants carry no interpolated detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Sender has no session, no game, or a finished game.
    #[error("Invalid game state")]
    InvalidGameState,

    /// Move payload is not `{x: int, y: int}`.
    #[error("Invalid move data")]
    InvalidMoveData,

    /// Sender is not one of the game's two participants.
    #[error("You are not part of this game")]
    NotParticipant,

    /// It is the other participant's turn.
    #[error("It's not your turn")]
    NotYourTurn,

    /// Coordinates fall outside the 3×3 grid.
    #[error("Invalid move coordinates")]
    InvalidCoordinates,

    /// Target cell already holds a marker.
    #[error("Cell already occupied")]
    CellOccupied,
}

/// Failure to enqueue an outbound frame for a connection.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The connection's writer task has gone away.
    #[error("connection closed")]
    Closed,

    /// The per-connection outbound queue is at capacity.
    #[error("outbound queue full")]
    Full,

    /// The message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Session registry failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A live session already uses this connection id.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Invalid startup configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Port outside `[1024, 65535]`.
    #[error("invalid port number: {0} (expected 1024..=65535)")]
    InvalidPort(i64),

    /// `LISTEN_HOST` is not an IP address.
    #[error("invalid listen host {value:?}: {source}")]
    InvalidHost {
        /// Raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// A numeric environment variable could not be parsed or is out of range.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}
