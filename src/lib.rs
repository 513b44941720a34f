//! # gridwarriors-server
//!
//! Realtime session server for two-player tic-tac-toe matches over
//! WebSocket.
//!
//! Clients connect to `GET /ws`, set a display name with `join`, ask for a
//! match with `start` and play with `move`. The server pairs waiting
//! players, picks who moves first, validates every move and pushes
//! `game_start`, `game_update`, `game_end` and `error` notifications.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler + connection tasks (ws/)
//!     ├── REST Handlers: /health, /stats (api/)
//!     │
//!     ├── Dispatcher (service/)   one lock around all state
//!     │     ├── Matchmaker
//!     │     └── Move coordinator
//!     │
//!     └── SessionRegistry, Game, Board (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
