//! Pairs two waiting sessions into a new game.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{ConnectionId, Game, GameId, Marker, SessionRegistry};
use crate::ws::ServerMessage;
use crate::ws::messages::GameStartData;

/// Creates games from unmatched sessions and picks who moves first.
pub struct Matchmaker {
    rng: StdRng,
}

impl Matchmaker {
    /// Matchmaker seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Matchmaker with a fixed seed, for reproducible turn order.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Starts a game if at least two sessions are waiting.
    ///
    /// The requester is preferred for the first slot when it is waiting
    /// itself; otherwise, and for the second slot, the longest-waiting
    /// sessions are taken. The first slot plays [`Marker::X`]. Which marker
    /// moves first is a fair coin flip. Both participants are sent
    /// `game_start`.
    ///
    /// Returns `None`, after logging, when fewer than two sessions wait.
    pub fn try_start(
        &mut self,
        registry: &mut SessionRegistry,
        requester: ConnectionId,
    ) -> Option<GameId> {
        let waiting = registry.unmatched();
        let Some((player_x, player_o)) = pick_pair(&waiting, requester) else {
            tracing::info!(%requester, waiting = waiting.len(), "not enough players for game start");
            return None;
        };

        let turn = if self.rng.gen_bool(0.5) {
            Marker::X
        } else {
            Marker::O
        };

        let game_id = registry.next_game_id();
        let game = Game::new(game_id, player_x, player_o, turn)?;
        registry.insert_game(game);

        let name_x = registry.name_of(player_x).to_string();
        let name_o = registry.name_of(player_o).to_string();
        tracing::info!(
            %game_id,
            player_x = %name_x,
            player_o = %name_o,
            %turn,
            "game started"
        );

        for (recipient, role, opponent) in [
            (player_x, Marker::X, name_o),
            (player_o, Marker::O, name_x),
        ] {
            let msg = ServerMessage::GameStart(GameStartData {
                game_id,
                your_role: role,
                opponent,
                turn,
            });
            registry.send(recipient, &msg);
        }

        Some(game_id)
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Matchmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchmaker").finish_non_exhaustive()
    }
}

/// Chooses two distinct sessions from `waiting` (registration order).
fn pick_pair(
    waiting: &[ConnectionId],
    requester: ConnectionId,
) -> Option<(ConnectionId, ConnectionId)> {
    let first = if waiting.contains(&requester) {
        requester
    } else {
        *waiting.first()?
    };
    let second = waiting.iter().copied().find(|id| *id != first)?;
    Some((first, second))
}
