//! WebSocket connection state machine.
//!
//! Each connection runs two tasks: the read loop below, which feeds frames
//! to the [`Dispatcher`], and a writer task draining the connection's
//! outbound queue into the socket. Any way the read loop ends (leave,
//! close frame, read error, end of stream) goes through the same leave
//! path.

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::outbound::{ConnectionHandle, Outbound};
use crate::domain::ConnectionId;
use crate::error::ProtocolError;
use crate::service::Dispatcher;

/// Runs one connection until the client leaves or the socket ends.
pub async fn run_connection(socket: WebSocket, dispatcher: Arc<Dispatcher>, outbound_buffer: usize) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, out_rx) = ConnectionHandle::channel(outbound_buffer);

    let id = match dispatcher.register(handle.clone()).await {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(error = %err, "failed to register connection");
            return;
        }
    };
    tracing::info!(conn_id = %id, "ws connection opened");

    let writer = tokio::spawn(write_loop(id, ws_tx, out_rx));

    while let Some(frame) = ws_rx.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!(conn_id = %id, error = %ProtocolError::NotUtf8, "dropping frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(conn_id = %id, error = %err, "ws read error");
                break;
            }
        };
        if let ControlFlow::Break(()) = dispatcher.handle_text(id, &handle, &text).await {
            break;
        }
    }

    dispatcher.leave(id).await;
    drop(handle);
    if let Err(err) = writer.await {
        tracing::warn!(conn_id = %id, error = %err, "ws writer task failed");
    }
    tracing::info!(conn_id = %id, "ws connection closed");
}

/// Drains `rx` into the socket until a close is requested, every sender is
/// gone, or the socket rejects a write.
async fn write_loop(
    id: ConnectionId,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Text(json) => {
                if let Err(err) = ws_tx.send(Message::text(json)).await {
                    tracing::debug!(conn_id = %id, error = %err, "ws write failed");
                    break;
                }
            }
            Outbound::Close => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
    let _ = ws_tx.close().await;
}
