//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::Dispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Owner of every session and game.
    pub dispatcher: Arc<Dispatcher>,
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
}

impl AppState {
    /// State around a fresh, empty dispatcher.
    #[must_use]
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new()),
            outbound_buffer,
        }
    }
}
