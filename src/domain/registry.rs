//! Session and game tables.
//!
//! [`SessionRegistry`] is the single source of truth for the
//! connection → session mapping and for every game ever created. It holds
//! no lock of its own: the dispatcher keeps it behind one mutex and holds
//! that mutex for a whole handler, so a session's game link and the game's
//! participant links always change together.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::{ConnectionId, Game, GameId, Session};
use crate::error::RegistryError;
use crate::ws::{ConnectionHandle, ServerMessage};

/// Counters exposed on `GET /stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RegistryStats {
    /// Live sessions.
    pub sessions: usize,
    /// Games created since startup.
    pub games_total: usize,
    /// Games not yet finished.
    pub games_in_progress: usize,
}

/// Owned table of sessions keyed by connection and games keyed by id.
///
/// Games are append-only and kept for the process lifetime.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
    games: BTreeMap<GameId, Game>,
    next_seq: u64,
    last_game_id: Option<GameId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new unnamed session for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateConnection`] if a session already
    /// exists for the handle's connection id.
    pub fn register(&mut self, handle: ConnectionHandle) -> Result<&Session, RegistryError> {
        let id = handle.id();
        if self.sessions.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let session = self.sessions.entry(id).or_insert(Session::new(handle, seq));
        Ok(&*session)
    }

    /// Updates the display name. Returns `false` if the session is gone.
    pub fn set_name(&mut self, id: ConnectionId, name: &str) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes the session and closes its connection.
    ///
    /// Returns `None` if it was already removed. Any game it took part in
    /// keeps referring to the id.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        session.handle.close();
        Some(session)
    }

    /// Looks up a session.
    #[must_use]
    pub fn session(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Display name of a session, or `""` if it is gone.
    #[must_use]
    pub fn name_of(&self, id: ConnectionId) -> &str {
        self.sessions.get(&id).map_or("", |s| s.name.as_str())
    }

    /// Whether the session has a linked game that is still being played.
    #[must_use]
    pub fn in_active_game(&self, id: ConnectionId) -> bool {
        self.active_game(id).is_some()
    }

    /// The unfinished game linked to `id`, if any.
    #[must_use]
    pub fn active_game(&self, id: ConnectionId) -> Option<&Game> {
        let game_id = self.sessions.get(&id)?.game?;
        self.games.get(&game_id).filter(|g| !g.finished)
    }

    /// Sessions not in an active game, in registration order.
    #[must_use]
    pub fn unmatched(&self) -> Vec<ConnectionId> {
        let mut waiting: Vec<&Session> = self
            .sessions
            .values()
            .filter(|s| !self.in_active_game(s.id()))
            .collect();
        waiting.sort_by_key(|s| s.seq);
        waiting.into_iter().map(Session::id).collect()
    }

    /// Hands out a creation-time game id, strictly greater than any
    /// previous one.
    pub fn next_game_id(&mut self) -> GameId {
        let candidate = GameId::from_timestamp(Utc::now());
        let id = match self.last_game_id {
            Some(last) if candidate <= last => last.successor(),
            _ => candidate,
        };
        self.last_game_id = Some(id);
        id
    }

    /// Stores a new game and links both participants to it.
    pub fn insert_game(&mut self, game: Game) -> GameId {
        let id = game.id;
        for (conn, _) in game.participants() {
            if let Some(session) = self.sessions.get_mut(&conn) {
                session.game = Some(id);
            }
        }
        self.games.insert(id, game);
        id
    }

    /// Looks up a game.
    #[must_use]
    pub fn game(&self, id: GameId) -> Option<&Game> {
        self.games.get(&id)
    }

    /// Mutable game lookup.
    pub fn game_mut(&mut self, id: GameId) -> Option<&mut Game> {
        self.games.get_mut(&id)
    }

    /// Enqueues `msg` for `id`.
    ///
    /// Delivery is best effort: a missing session or a failed enqueue is
    /// logged and reported as `false`.
    pub fn send(&self, id: ConnectionId, msg: &ServerMessage) -> bool {
        let Some(session) = self.sessions.get(&id) else {
            tracing::warn!(conn_id = %id, kind = msg.kind(), "recipient not connected");
            return false;
        };
        match session.handle.send(msg) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    conn_id = %id,
                    name = %session.name,
                    kind = msg.kind(),
                    error = %err,
                    "failed to send"
                );
                false
            }
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            sessions: self.sessions.len(),
            games_total: self.games.len(),
            games_in_progress: self.games.values().filter(|g| !g.finished).count(),
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
