//! WebSocket message types: envelope, inbound commands and outbound
//! notifications.
//!
//! Every frame in either direction is a JSON object
//! `{"type": <string>, "data": <object>}`.

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{Board, GameId, Marker, Outcome};
use crate::error::{GameError, ProtocolError};

/// Top-level message envelope as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Variant-specific payload. `null` when absent.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Closed set of commands a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Set the display name.
    Join {
        /// Requested display name.
        name: String,
    },
    /// End the session.
    Leave,
    /// Ask the matchmaker to pair two waiting sessions.
    Start,
    /// Play a cell. The payload stays undecoded here so the coordinator can
    /// check game state before it looks at the coordinates.
    Move(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct JoinData {
    #[serde(default)]
    name: String,
}

impl ClientMessage {
    /// Decodes a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if the envelope is not valid,
    /// otherwise whatever [`ClientMessage::from_envelope`] returns.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        Self::from_envelope(envelope)
    }

    /// Maps an envelope onto a command by its `type` tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownType`] for unrecognized tags and
    /// [`ProtocolError::InvalidPayload`] when a `join` payload is not
    /// `{name: string}`.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        match envelope.msg_type.as_str() {
            "join" => {
                let data: JoinData = serde_json::from_value(envelope.data)
                    .map_err(|source| ProtocolError::InvalidPayload { kind: "join", source })?;
                Ok(Self::Join { name: data.name })
            }
            "leave" => Ok(Self::Leave),
            "start" => Ok(Self::Start),
            "move" => Ok(Self::Move(envelope.data)),
            _ => Err(ProtocolError::UnknownType(envelope.msg_type)),
        }
    }

    /// Tag of this command, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::Start => "start",
            Self::Move(_) => "move",
        }
    }
}

/// Payload of a `move` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MoveData {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
}

impl MoveData {
    /// Decodes a `move` payload.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidMoveData`] unless the payload is an object
    /// with integer `x` and `y`.
    pub fn decode(data: &serde_json::Value) -> Result<Self, GameError> {
        Self::deserialize(data).map_err(|err| {
            tracing::debug!(error = %err, "move payload rejected");
            GameError::InvalidMoveData
        })
    }
}

/// Notifications the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A game was created for the recipient.
    GameStart(GameStartData),
    /// A move was accepted and the game continues.
    GameUpdate(GameUpdateData),
    /// The game reached a win or draw.
    GameEnd(GameEndData),
    /// The recipient's last command was rejected.
    Error(ErrorData),
}

impl ServerMessage {
    /// Builds an `error` notification for a rule violation.
    #[must_use]
    pub fn error(err: &GameError) -> Self {
        Self::Error(ErrorData {
            message: err.to_string(),
        })
    }

    /// Tag of this notification, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GameStart(_) => "game_start",
            Self::GameUpdate(_) => "game_update",
            Self::GameEnd(_) => "game_end",
            Self::Error(_) => "error",
        }
    }
}

/// `game_start` payload, personalized per recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStartData {
    /// New game's identifier.
    pub game_id: GameId,
    /// Recipient's marker.
    pub your_role: Marker,
    /// Opponent's display name.
    pub opponent: String,
    /// Marker that moves first.
    pub turn: Marker,
}

/// `game_update` payload, identical for both participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameUpdateData {
    /// Full grid after the move.
    pub board: Board,
    /// Marker that moves next.
    pub turn: Marker,
}

/// Per-recipient result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// Recipient completed a line.
    Win,
    /// Opponent completed a line.
    Lose,
    /// Board filled without a line.
    Draw,
}

impl GameResult {
    /// Result of `outcome` as seen by the player holding `role`.
    ///
    /// Returns `None` while the game is still in progress.
    #[must_use]
    pub fn for_role(outcome: Outcome, role: Marker) -> Option<Self> {
        match outcome {
            Outcome::InProgress => None,
            Outcome::Draw => Some(Self::Draw),
            Outcome::Win(winner) if winner == role => Some(Self::Win),
            Outcome::Win(_) => Some(Self::Lose),
        }
    }
}

/// `game_end` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEndData {
    /// Winning marker; serialized as `""` for a draw.
    #[serde(serialize_with = "serialize_winner")]
    pub winner: Option<Marker>,
    /// Outcome from the recipient's point of view.
    pub result: GameResult,
}

fn serialize_winner<S: Serializer>(winner: &Option<Marker>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(winner.map_or("", Marker::symbol))
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorData {
    /// Human-readable reason.
    pub message: String,
}
