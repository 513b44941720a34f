//! Per-game move validation and lifecycle.
//!
//! A game moves from in-progress to finished exactly once. Each accepted
//! move either ends the game (`game_end` to both participants) or flips the
//! turn (`game_update` to both). Rejections are returned to the caller,
//! which reports them to the sender only.

use crate::domain::board::BOARD_SIZE;
use crate::domain::{ConnectionId, GameId, Marker, Outcome, SessionRegistry, check_outcome};
use crate::error::GameError;
use crate::ws::ServerMessage;
use crate::ws::messages::{GameEndData, GameResult, GameUpdateData, MoveData};

/// Summary of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveApplied {
    /// Game the move was played in.
    pub game_id: GameId,
    /// Marker that was placed.
    pub role: Marker,
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    /// Board evaluation after the move.
    pub outcome: Outcome,
}

/// Validates and applies a move from `sender`, then notifies both
/// participants.
///
/// Checks run in this order and stop at the first failure: active game,
/// payload shape, participation, turn, coordinates, empty cell. A rejected
/// move leaves the game untouched.
///
/// # Errors
///
/// Returns the [`GameError`] for the first failed check.
pub fn submit_move(
    registry: &mut SessionRegistry,
    sender: ConnectionId,
    data: &serde_json::Value,
) -> Result<MoveApplied, GameError> {
    let Some(game_id) = registry.active_game(sender).map(|g| g.id) else {
        tracing::warn!(conn_id = %sender, "invalid move: no session or game inactive");
        return Err(GameError::InvalidGameState);
    };
    let name = registry.name_of(sender).to_string();

    let mv = MoveData::decode(data).inspect_err(|_| {
        tracing::warn!(%game_id, %name, "invalid move data");
    })?;

    let Some(game) = registry.game_mut(game_id) else {
        return Err(GameError::InvalidGameState);
    };

    let Some(role) = game.role_of(sender) else {
        tracing::warn!(%game_id, %name, "player not part of the game");
        return Err(GameError::NotParticipant);
    };

    if game.turn != role {
        tracing::warn!(%game_id, %name, %role, turn = %game.turn, "move out of turn");
        return Err(GameError::NotYourTurn);
    }

    let (Some(x), Some(y)) = (grid_index(mv.x), grid_index(mv.y)) else {
        tracing::warn!(%game_id, %name, x = mv.x, y = mv.y, "invalid move coordinates");
        return Err(GameError::InvalidCoordinates);
    };

    if !game.board.cell(x, y).is_some_and(|cell| cell.is_empty()) {
        tracing::warn!(%game_id, %name, x, y, "cell already occupied");
        return Err(GameError::CellOccupied);
    }

    game.board
        .apply_move(x, y, role)
        .map_err(|_| GameError::InvalidCoordinates)?;
    tracing::info!(%game_id, %name, %role, x, y, "move played");
    tracing::debug!(%game_id, board = %game.board, "board state");

    let outcome = check_outcome(&game.board);
    if outcome.is_terminal() {
        game.finished = true;
    } else {
        game.turn = role.opponent();
    }

    let participants = game.participants();
    let update = GameUpdateData {
        board: game.board.clone(),
        turn: game.turn,
    };

    match outcome {
        Outcome::InProgress => {
            let msg = ServerMessage::GameUpdate(update);
            for (conn, _) in participants {
                registry.send(conn, &msg);
            }
        }
        Outcome::Win(_) | Outcome::Draw => {
            tracing::info!(
                %game_id,
                winner = outcome.winner().map_or("", Marker::symbol),
                draw = outcome.is_draw(),
                "game finished"
            );
            for (conn, player_role) in participants {
                if let Some(result) = GameResult::for_role(outcome, player_role) {
                    let msg = ServerMessage::GameEnd(GameEndData {
                        winner: outcome.winner(),
                        result,
                    });
                    registry.send(conn, &msg);
                }
            }
        }
    }

    Ok(MoveApplied {
        game_id,
        role,
        x,
        y,
        outcome,
    })
}

/// Converts a wire coordinate into a grid index, if on the board.
fn grid_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|v| *v < BOARD_SIZE)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::{Board, Cell, Game};
    use crate::ws::{ConnectionHandle, Outbound};
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Table {
        registry: SessionRegistry,
        game_id: GameId,
        x: ConnectionId,
        o: ConnectionId,
        rx_x: mpsc::Receiver<Outbound>,
        rx_o: mpsc::Receiver<Outbound>,
    }

    fn connect(
        registry: &mut SessionRegistry,
        name: &str,
    ) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let (handle, rx) = ConnectionHandle::channel(16);
        let Ok(session) = registry.register(handle) else {
            panic!("register failed");
        };
        let id = session.id();
        registry.set_name(id, name);
        (id, rx)
    }

    fn table(first_turn: Marker) -> Table {
        let mut registry = SessionRegistry::new();
        let (x, rx_x) = connect(&mut registry, "A");
        let (o, rx_o) = connect(&mut registry, "B");
        let game_id = registry.next_game_id();
        let Some(game) = Game::new(game_id, x, o, first_turn) else {
            panic!("distinct players");
        };
        registry.insert_game(game);
        Table {
            registry,
            game_id,
            x,
            o,
            rx_x,
            rx_o,
        }
    }

    fn next_json(rx: &mut mpsc::Receiver<Outbound>) -> serde_json::Value {
        let Ok(Outbound::Text(text)) = rx.try_recv() else {
            panic!("expected a text frame");
        };
        let Ok(value) = serde_json::from_str(&text) else {
            panic!("invalid json: {text}");
        };
        value
    }

    fn board(t: &Table) -> Board {
        let Some(game) = t.registry.game(t.game_id) else {
            panic!("game missing");
        };
        game.board.clone()
    }

    fn play(t: &mut Table, who: ConnectionId, x: i64, y: i64) -> Result<MoveApplied, GameError> {
        submit_move(&mut t.registry, who, &json!({"x": x, "y": y}))
    }

    #[test]
    fn accepted_move_flips_turn_and_broadcasts_update() {
        let mut t = table(Marker::X);
        let (x, o) = (t.x, t.o);
        let Ok(applied) = play(&mut t, x, 1, 0) else {
            panic!("move should be accepted");
        };
        assert_eq!(applied.outcome, Outcome::InProgress);
        assert_eq!(board(&t).cell(1, 0), Some(Cell::Marked(Marker::X)));
        assert_eq!(t.registry.game(t.game_id).map(|g| g.turn), Some(Marker::O));

        for rx in [&mut t.rx_x, &mut t.rx_o] {
            let update = next_json(rx);
            assert_eq!(update["type"], "game_update");
            assert_eq!(update["data"]["turn"], "O");
            assert_eq!(update["data"]["board"][0][1], "X");
        }
    }

    #[test]
    fn out_of_turn_move_is_rejected_without_change() {
        let mut t = table(Marker::X);
        let o = t.o;
        assert_eq!(play(&mut t, o, 0, 0), Err(GameError::NotYourTurn));
        assert_eq!(board(&t), Board::new());
        assert!(t.rx_x.try_recv().is_err());
        assert!(t.rx_o.try_recv().is_err());
    }

    #[test]
    fn occupied_cell_is_rejected_without_change() {
        let mut t = table(Marker::O);
        let (x, o) = (t.x, t.o);
        assert!(play(&mut t, o, 2, 2).is_ok());
        let before = board(&t);
        assert_eq!(play(&mut t, x, 2, 2), Err(GameError::CellOccupied));
        assert_eq!(board(&t), before);
        assert_eq!(t.registry.game(t.game_id).map(|g| g.turn), Some(Marker::X));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut t = table(Marker::X);
        let x = t.x;
        assert_eq!(play(&mut t, x, 3, 0), Err(GameError::InvalidCoordinates));
        assert_eq!(play(&mut t, x, 0, -1), Err(GameError::InvalidCoordinates));
        assert_eq!(board(&t), Board::new());
    }

    #[test]
    fn malformed_payload_is_invalid_move_data() {
        let mut t = table(Marker::X);
        let x = t.x;
        let result = submit_move(&mut t.registry, x, &json!({"x": "a", "y": 0}));
        assert_eq!(result, Err(GameError::InvalidMoveData));
    }

    #[test]
    fn game_state_is_checked_before_payload() {
        let mut registry = SessionRegistry::new();
        let (lonely, _rx) = connect(&mut registry, "C");
        let result = submit_move(&mut registry, lonely, &json!("garbage"));
        assert_eq!(result, Err(GameError::InvalidGameState));

        let result = submit_move(&mut registry, ConnectionId::new(), &json!({"x": 0, "y": 0}));
        assert_eq!(result, Err(GameError::InvalidGameState));
    }

    #[test]
    fn turn_is_checked_before_coordinates() {
        let mut t = table(Marker::X);
        let o = t.o;
        assert_eq!(play(&mut t, o, 9, 9), Err(GameError::NotYourTurn));
    }

    #[test]
    fn winning_move_ends_game_with_per_player_results() {
        let mut t = table(Marker::X);
        let (x, o) = (t.x, t.o);
        for (who, col, row) in [(x, 0, 0), (o, 0, 1), (x, 1, 0), (o, 1, 1)] {
            assert!(play(&mut t, who, col, row).is_ok());
        }
        while t.rx_x.try_recv().is_ok() {}
        while t.rx_o.try_recv().is_ok() {}

        let Ok(applied) = play(&mut t, x, 2, 0) else {
            panic!("winning move should be accepted");
        };
        assert_eq!(applied.outcome, Outcome::Win(Marker::X));
        let Some(game) = t.registry.game(t.game_id) else {
            panic!("game missing");
        };
        assert!(game.finished);
        assert_eq!(game.turn, Marker::X);

        let end_x = next_json(&mut t.rx_x);
        let end_o = next_json(&mut t.rx_o);
        assert_eq!(end_x, json!({"type": "game_end", "data": {"winner": "X", "result": "win"}}));
        assert_eq!(end_o, json!({"type": "game_end", "data": {"winner": "X", "result": "lose"}}));

        assert_eq!(play(&mut t, o, 2, 2), Err(GameError::InvalidGameState));
        assert_eq!(t.registry.game(t.game_id).map(|g| g.turn), Some(Marker::X));
    }

    #[test]
    fn full_board_ends_in_draw() {
        let mut t = table(Marker::X);
        let (x, o) = (t.x, t.o);
        // X O X / X O O / O X X
        let moves = [
            (x, 0, 0),
            (o, 1, 0),
            (x, 2, 0),
            (o, 1, 1),
            (x, 0, 1),
            (o, 2, 1),
            (x, 1, 2),
            (o, 0, 2),
        ];
        for (who, col, row) in moves {
            let Ok(applied) = play(&mut t, who, col, row) else {
                panic!("move ({col}, {row}) rejected");
            };
            assert_eq!(applied.outcome, Outcome::InProgress);
        }
        while t.rx_x.try_recv().is_ok() {}
        while t.rx_o.try_recv().is_ok() {}

        let Ok(applied) = play(&mut t, x, 2, 2) else {
            panic!("last move rejected");
        };
        assert_eq!(applied.outcome, Outcome::Draw);
        for rx in [&mut t.rx_x, &mut t.rx_o] {
            assert_eq!(
                next_json(rx),
                json!({"type": "game_end", "data": {"winner": "", "result": "draw"}})
            );
        }
    }

    #[test]
    fn departed_opponent_does_not_block_mover() {
        let mut t = table(Marker::X);
        let (x, o) = (t.x, t.o);
        t.registry.unregister(o);
        assert!(play(&mut t, x, 1, 1).is_ok());
        assert_eq!(next_json(&mut t.rx_x)["type"], "game_update");
        assert!(t.registry.in_active_game(x));
    }
}
