//! Per-connection outbound queue.
//!
//! Every connection owns a bounded [`mpsc`] queue drained by its writer
//! task. [`ConnectionHandle`] is the sending half: handlers enqueue with a
//! non-blocking `try_send`, so sending while the dispatcher lock is held
//! never waits on the network.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::messages::ServerMessage;
use crate::domain::ConnectionId;
use crate::error::SendError;

/// Item consumed by a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded JSON text frame.
    Text(String),
    /// Send a close frame and stop writing.
    Close,
}

/// Cloneable sender for one connection, tagged with its [`ConnectionId`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh id and the receiving end for the
    /// writer task. A `capacity` of zero is raised to one.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            tx,
        };
        (handle, rx)
    }

    /// Identifier of the connection behind this handle.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Encodes `msg` and enqueues it.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Full`] when the queue is at capacity,
    /// [`SendError::Closed`] when the writer task has exited, and
    /// [`SendError::Encode`] if serialization fails.
    pub fn send(&self, msg: &ServerMessage) -> Result<(), SendError> {
        let json = serde_json::to_string(msg)?;
        self.push(Outbound::Text(json))
    }

    /// Asks the writer task to close the socket. Best effort.
    pub fn close(&self) {
        if let Err(err) = self.push(Outbound::Close) {
            tracing::debug!(conn_id = %self.id, error = %err, "close not enqueued");
        }
    }

    /// Returns `true` once the writer task has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn push(&self, item: Outbound) -> Result<(), SendError> {
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::ws::messages::ErrorData;

    fn error_msg(text: &str) -> ServerMessage {
        ServerMessage::Error(ErrorData {
            message: text.to_string(),
        })
    }

    #[test]
    fn send_enqueues_json() {
        let (handle, mut rx) = ConnectionHandle::channel(4);
        assert!(handle.send(&error_msg("boom")).is_ok());
        let Ok(Outbound::Text(json)) = rx.try_recv() else {
            panic!("expected text frame");
        };
        assert!(json.contains("\"boom\""));
    }

    #[test]
    fn full_queue_reports_full() {
        let (handle, _rx) = ConnectionHandle::channel(1);
        assert!(handle.send(&error_msg("a")).is_ok());
        assert!(matches!(handle.send(&error_msg("b")), Err(SendError::Full)));
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (handle, rx) = ConnectionHandle::channel(1);
        drop(rx);
        assert!(handle.is_closed());
        assert!(matches!(
            handle.send(&error_msg("a")),
            Err(SendError::Closed)
        ));
    }

    #[test]
    fn close_enqueues_close() {
        let (handle, mut rx) = ConnectionHandle::channel(1);
        handle.close();
        assert_eq!(rx.try_recv().ok(), Some(Outbound::Close));
    }

    #[test]
    fn clones_share_id() {
        let (handle, _rx) = ConnectionHandle::channel(1);
        assert_eq!(handle.clone().id(), handle.id());
    }
}
