//! Session dispatcher: the single critical section around all shared state.
//!
//! Every handler (join, leave, start, move) acquires the one
//! [`tokio::sync::Mutex`] guarding the [`SessionRegistry`] and the
//! [`Matchmaker`], runs to completion, and releases it. Outbound
//! notifications are enqueued while the lock is held; enqueueing never
//! waits, so no handler blocks on the network.

use std::ops::ControlFlow;

use tokio::sync::Mutex;

use super::coordinator::{self, MoveApplied};
use super::matchmaker::Matchmaker;
use crate::domain::{ConnectionId, Game, GameId, RegistryStats, SessionRegistry};
use crate::error::{GameError, ProtocolError, RegistryError};
use crate::ws::{ClientMessage, ConnectionHandle, ServerMessage};

#[derive(Debug)]
struct Shared {
    registry: SessionRegistry,
    matchmaker: Matchmaker,
}

/// Owns all connection and game state and routes inbound commands.
#[derive(Debug)]
pub struct Dispatcher {
    shared: Mutex<Shared>,
}

impl Dispatcher {
    /// Creates an empty dispatcher with an entropy-seeded matchmaker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_matchmaker(Matchmaker::new())
    }

    /// Creates an empty dispatcher whose turn order is reproducible.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_matchmaker(Matchmaker::with_seed(seed))
    }

    fn with_matchmaker(matchmaker: Matchmaker) -> Self {
        Self {
            shared: Mutex::new(Shared {
                registry: SessionRegistry::new(),
                matchmaker,
            }),
        }
    }

    /// Registers a new connection and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateConnection`] if the handle is
    /// already registered.
    pub async fn register(&self, handle: ConnectionHandle) -> Result<ConnectionId, RegistryError> {
        let mut shared = self.shared.lock().await;
        let id = shared.registry.register(handle)?.id();
        tracing::debug!(conn_id = %id, "connection registered");
        Ok(id)
    }

    /// Sets the display name of `id`. Unknown ids are logged and ignored.
    pub async fn join(&self, id: ConnectionId, name: &str) {
        let mut shared = self.shared.lock().await;
        if shared.registry.set_name(id, name) {
            tracing::info!(conn_id = %id, %name, "player joined");
        } else {
            tracing::warn!(conn_id = %id, %name, "join from unregistered connection");
        }
    }

    /// Removes the session and closes its connection. Idempotent.
    ///
    /// Returns `true` if a session was removed.
    pub async fn leave(&self, id: ConnectionId) -> bool {
        let mut shared = self.shared.lock().await;
        match shared.registry.unregister(id) {
            Some(session) => {
                let connected_secs = (chrono::Utc::now() - session.connected_at).num_seconds();
                tracing::info!(
                    conn_id = %id,
                    name = %session.name,
                    game = ?session.game,
                    connected_secs,
                    "player left"
                );
                true
            }
            None => false,
        }
    }

    /// Asks the matchmaker to pair two waiting sessions.
    pub async fn start(&self, requester: ConnectionId) -> Option<GameId> {
        let mut guard = self.shared.lock().await;
        let Shared {
            registry,
            matchmaker,
        } = &mut *guard;
        matchmaker.try_start(registry, requester)
    }

    /// Applies a move for `sender`.
    ///
    /// A rejection is reported to the sender as an `error` notification,
    /// through its session if it has one and through `reply` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the [`GameError`] that was reported.
    pub async fn submit_move(
        &self,
        sender: ConnectionId,
        reply: &ConnectionHandle,
        data: &serde_json::Value,
    ) -> Result<MoveApplied, GameError> {
        let mut shared = self.shared.lock().await;
        coordinator::submit_move(&mut shared.registry, sender, data).inspect_err(|err| {
            let msg = ServerMessage::error(err);
            if shared.registry.session(sender).is_some() {
                shared.registry.send(sender, &msg);
            } else if let Err(send_err) = reply.send(&msg) {
                tracing::warn!(conn_id = %sender, error = %send_err, "failed to send error");
            }
        })
    }

    /// Routes one decoded command.
    ///
    /// Returns [`ControlFlow::Break`] after `leave`, telling the connection
    /// loop to stop reading.
    pub async fn dispatch(
        &self,
        id: ConnectionId,
        reply: &ConnectionHandle,
        msg: ClientMessage,
    ) -> ControlFlow<()> {
        match msg {
            ClientMessage::Join { name } => self.join(id, &name).await,
            ClientMessage::Leave => {
                self.leave(id).await;
                return ControlFlow::Break(());
            }
            ClientMessage::Start => {
                self.start(id).await;
            }
            ClientMessage::Move(data) => {
                let _ = self.submit_move(id, reply, &data).await;
            }
        }
        ControlFlow::Continue(())
    }

    /// Decodes a raw text frame and routes it.
    ///
    /// Undecodable frames and unknown message types are logged and dropped;
    /// they never end the connection.
    pub async fn handle_text(
        &self,
        id: ConnectionId,
        reply: &ConnectionHandle,
        text: &str,
    ) -> ControlFlow<()> {
        match ClientMessage::decode(text) {
            Ok(msg) => {
                tracing::trace!(conn_id = %id, kind = msg.kind(), "message received");
                self.dispatch(id, reply, msg).await
            }
            Err(err @ ProtocolError::UnknownType(_)) => {
                tracing::info!(conn_id = %id, error = %err, "ignoring message");
                ControlFlow::Continue(())
            }
            Err(err) => {
                tracing::warn!(conn_id = %id, error = %err, "bad message");
                ControlFlow::Continue(())
            }
        }
    }

    /// Session and game counters.
    pub async fn stats(&self) -> RegistryStats {
        self.shared.lock().await.registry.stats()
    }

    /// Snapshot of a game.
    pub async fn game(&self, id: GameId) -> Option<Game> {
        self.shared.lock().await.registry.game(id).cloned()
    }

    /// Display name and linked game of a session, if it exists.
    pub async fn session_info(&self, id: ConnectionId) -> Option<(String, Option<GameId>)> {
        let shared = self.shared.lock().await;
        shared
            .registry
            .session(id)
            .map(|s| (s.name.clone(), s.game))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::{Board, Marker};
    use crate::ws::Outbound;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Client {
        id: ConnectionId,
        handle: ConnectionHandle,
        rx: mpsc::Receiver<Outbound>,
    }

    impl Client {
        async fn connect(dispatcher: &Dispatcher) -> Self {
            let (handle, rx) = ConnectionHandle::channel(16);
            let Ok(id) = dispatcher.register(handle.clone()).await else {
                panic!("register failed");
            };
            Self { id, handle, rx }
        }

        async fn send(&self, dispatcher: &Dispatcher, text: &str) -> ControlFlow<()> {
            dispatcher.handle_text(self.id, &self.handle, text).await
        }

        fn next(&mut self) -> serde_json::Value {
            let Ok(Outbound::Text(text)) = self.rx.try_recv() else {
                panic!("expected a text frame");
            };
            let Ok(value) = serde_json::from_str(&text) else {
                panic!("invalid json: {text}");
            };
            value
        }

        fn drain(&mut self) {
            while self.rx.try_recv().is_ok() {}
        }
    }

    async fn joined_pair(dispatcher: &Dispatcher) -> (Client, Client) {
        let a = Client::connect(dispatcher).await;
        let b = Client::connect(dispatcher).await;
        let _ = a.send(dispatcher, r#"{"type":"join","data":{"name":"A"}}"#).await;
        let _ = b.send(dispatcher, r#"{"type":"join","data":{"name":"B"}}"#).await;
        (a, b)
    }

    #[tokio::test]
    async fn join_sets_name() {
        let dispatcher = Dispatcher::with_seed(1);
        let (a, _b) = joined_pair(&dispatcher).await;
        let Some((name, game)) = dispatcher.session_info(a.id).await else {
            panic!("session missing");
        };
        assert_eq!(name, "A");
        assert!(game.is_none());
    }

    #[tokio::test]
    async fn start_sends_consistent_game_start() {
        let dispatcher = Dispatcher::with_seed(5);
        let (mut a, mut b) = joined_pair(&dispatcher).await;
        assert!(a.send(&dispatcher, r#"{"type":"start","data":{}}"#).await.is_continue());

        let start_a = a.next();
        let start_b = b.next();
        assert_eq!(start_a["type"], "game_start");
        assert_eq!(start_b["type"], "game_start");
        assert_ne!(start_a["data"]["your_role"], start_b["data"]["your_role"]);
        assert_eq!(start_a["data"]["turn"], start_b["data"]["turn"]);
        assert_eq!(start_a["data"]["game_id"], start_b["data"]["game_id"]);
        assert_eq!(start_a["data"]["opponent"], "B");
        assert_eq!(start_b["data"]["opponent"], "A");
    }

    #[tokio::test]
    async fn full_game_over_the_router() {
        let dispatcher = Dispatcher::with_seed(9);
        let (mut a, mut b) = joined_pair(&dispatcher).await;
        let Some(game_id) = dispatcher.start(b.id).await else {
            panic!("game should start");
        };
        let Some(game) = dispatcher.game(game_id).await else {
            panic!("game missing");
        };
        a.drain();
        b.drain();

        let (first, second) = if game.player(game.turn) == a.id {
            (&mut a, &mut b)
        } else {
            (&mut b, &mut a)
        };

        // First player takes the top row; second plays the middle row.
        for (mover_is_first, x, y) in [(true, 0, 0), (false, 0, 1), (true, 1, 0), (false, 1, 1)] {
            let mover: &Client = if mover_is_first { &*first } else { &*second };
            let text = json!({"type": "move", "data": {"x": x, "y": y}}).to_string();
            let _ = mover.send(&dispatcher, &text).await;
            assert_eq!(first.next()["type"], "game_update");
            assert_eq!(second.next()["type"], "game_update");
        }

        let _ = first
            .send(&dispatcher, r#"{"type":"move","data":{"x":2,"y":0}}"#)
            .await;
        let end_first = first.next();
        let end_second = second.next();
        assert_eq!(end_first["data"]["result"], "win");
        assert_eq!(end_second["data"]["result"], "lose");
        assert_eq!(end_first["data"]["winner"], game.turn.symbol());

        let Some(finished) = dispatcher.game(game_id).await else {
            panic!("game missing");
        };
        assert!(finished.finished);
        assert_eq!(dispatcher.stats().await.games_in_progress, 0);
    }

    #[tokio::test]
    async fn out_of_turn_move_reports_error_to_sender_only() {
        let dispatcher = Dispatcher::with_seed(2);
        let (mut a, mut b) = joined_pair(&dispatcher).await;
        let Some(game_id) = dispatcher.start(a.id).await else {
            panic!("game should start");
        };
        a.drain();
        b.drain();
        let Some(game) = dispatcher.game(game_id).await else {
            panic!("game missing");
        };
        let (waiting, other) = if game.player(game.turn) == a.id {
            (&mut b, &mut a)
        } else {
            (&mut a, &mut b)
        };

        let result = dispatcher
            .submit_move(waiting.id, &waiting.handle, &json!({"x": 0, "y": 0}))
            .await;
        assert_eq!(result, Err(GameError::NotYourTurn));
        assert_eq!(
            waiting.next(),
            json!({"type": "error", "data": {"message": "It's not your turn"}})
        );
        assert!(other.rx.try_recv().is_err());
        assert_eq!(dispatcher.game(game_id).await.map(|g| g.board), Some(Board::new()));
    }

    #[tokio::test]
    async fn move_without_session_replies_invalid_game_state() {
        let dispatcher = Dispatcher::with_seed(3);
        let (handle, mut rx) = ConnectionHandle::channel(4);
        let stranger = handle.id();

        let flow = dispatcher
            .handle_text(stranger, &handle, r#"{"type":"move","data":{"x":0,"y":0}}"#)
            .await;
        assert!(flow.is_continue());
        let Ok(Outbound::Text(text)) = rx.try_recv() else {
            panic!("expected error frame");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
            panic!("invalid json");
        };
        assert_eq!(value["data"]["message"], "Invalid game state");
        assert_eq!(dispatcher.stats().await.games_total, 0);
    }

    #[tokio::test]
    async fn leave_breaks_and_is_idempotent() {
        let dispatcher = Dispatcher::with_seed(4);
        let mut a = Client::connect(&dispatcher).await;
        let flow = a.send(&dispatcher, r#"{"type":"leave","data":{}}"#).await;
        assert!(flow.is_break());
        assert_eq!(a.rx.try_recv().ok(), Some(Outbound::Close));
        assert!(!dispatcher.leave(a.id).await);
        assert_eq!(dispatcher.stats().await.sessions, 0);
    }

    #[tokio::test]
    async fn junk_and_unknown_messages_are_ignored() {
        let dispatcher = Dispatcher::with_seed(6);
        let mut a = Client::connect(&dispatcher).await;
        for text in [
            "{{{",
            r#"{"type":"dance","data":{}}"#,
            r#"{"type":"join","data":{"name":42}}"#,
        ] {
            assert!(a.send(&dispatcher, text).await.is_continue());
        }
        assert!(a.rx.try_recv().is_err());
        assert_eq!(dispatcher.stats().await.sessions, 1);
    }

    #[tokio::test]
    async fn concurrent_starts_never_double_book() {
        let dispatcher = std::sync::Arc::new(Dispatcher::with_seed(8));
        let mut clients = Vec::new();
        for _ in 0..10 {
            clients.push(Client::connect(&dispatcher).await);
        }
        let mut tasks = Vec::new();
        for client in &clients {
            let dispatcher = std::sync::Arc::clone(&dispatcher);
            let id = client.id;
            tasks.push(tokio::spawn(async move { dispatcher.start(id).await }));
        }
        let mut games = Vec::new();
        for task in tasks {
            if let Ok(Some(game_id)) = task.await {
                games.push(game_id);
            }
        }
        assert_eq!(games.len(), 5);

        let mut seen = std::collections::HashSet::new();
        for game_id in games {
            let Some(game) = dispatcher.game(game_id).await else {
                panic!("game missing");
            };
            assert_ne!(game.player_x, game.player_o);
            assert!(seen.insert(game.player_x));
            assert!(seen.insert(game.player_o));
            assert!(matches!(game.turn, Marker::X | Marker::O));
        }
    }
}
