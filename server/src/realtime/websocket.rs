//! WebSocket endpoint: the shared-secret handshake gate and the
//! per-connection socket tasks.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;

use super::engine::{BroadcastEngine, ClientEvent, ServerEvent, HISTORY_LIMIT};
use super::registry::{self, ConnectionId};

/// Server-side heartbeat interval to detect stale connections.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket query parameters for the chat handshake.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Shared secret presented by the client.
    pub token: String,
}

/// WebSocket handler for the chat endpoint.
/// GET /ws?token=<secret> (WebSocket upgrade)
///
/// A bad credential terminates the attempt before the upgrade; no chat
/// event is processed for unauthenticated connections.
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    State(engine): State<Arc<BroadcastEngine>>,
    State(config): State<Arc<Config>>,
    Query(query): Query<ConnectQuery>,
) -> Result<Response, StatusCode> {
    if !registry::authenticate(&query.token, &config.api_key) {
        warn!("WebSocket handshake rejected, bad credential");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, engine)))
}

/// Handle one authenticated WebSocket connection.
async fn handle_socket(socket: WebSocket, engine: Arc<BroadcastEngine>) {
    let connection_id: ConnectionId = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    // Shared between the outbound forward task and the heartbeat task.
    let ws_sender = Arc::new(Mutex::new(ws_sender));

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    engine.registry().register(connection_id, event_tx);

    info!(
        connection = %connection_id,
        connections = engine.registry().len(),
        "Client connected"
    );

    // Forward engine events to the socket as JSON text frames.
    let sender_out = ws_sender.clone();
    let mut send_task = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(event_rx);
        while let Some(event) = events.next().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    error!(error = ?err, "Failed to serialize event");
                    continue;
                }
            };
            let mut sender_guard = sender_out.lock().await;
            if sender_guard.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive client events. Each one detaches into its own task: tearing
    // down the socket must not cancel an append already in flight, and the
    // commit still fans out to the remaining connections.
    let engine_recv = engine.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = ws_receiver.next().await {
            match frame {
                Message::Close(_) => break,
                Message::Ping(_) => {
                    // Pong is handled automatically by axum.
                    debug!("Received WebSocket ping");
                }
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        let engine = engine_recv.clone();
                        tokio::spawn(async move {
                            handle_event(engine, connection_id, event).await;
                        });
                    }
                    Err(err) => {
                        warn!(
                            connection = %connection_id,
                            error = %err,
                            "Unparseable client event"
                        );
                        engine_recv.registry().send_to(
                            &connection_id,
                            ServerEvent::Error {
                                reason: "malformed event".to_string(),
                            },
                        );
                    }
                },
                _ => {}
            }
        }
    });

    // Heartbeat to detect stale connections.
    let sender_heartbeat = ws_sender.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            interval.tick().await;
            let mut sender_guard = sender_heartbeat.lock().await;
            if sender_guard.send(Message::Ping(vec![].into())).await.is_err() {
                debug!("Heartbeat ping failed - connection likely closed");
                break;
            }
        }
    });

    // Any task ending tears the connection down.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut heartbeat_task) => {
            send_task.abort();
            recv_task.abort();
        }
    }

    engine.registry().unregister(&connection_id);

    info!(
        connection = %connection_id,
        connections = engine.registry().len(),
        "Client disconnected"
    );
}

/// Dispatch one parsed client event through the engine.
async fn handle_event(engine: Arc<BroadcastEngine>, connection_id: ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::Message { author, body } => {
            if let Err(err) = engine.publish(connection_id, &author, &body).await {
                engine.registry().send_to(
                    &connection_id,
                    ServerEvent::Error {
                        reason: err.to_string(),
                    },
                );
            }
        }
        ClientEvent::LoadHistory { request_id } => {
            let messages = engine.replay(HISTORY_LIMIT).await;
            engine.registry().send_to(
                &connection_id,
                ServerEvent::HistoryLoaded {
                    request_id,
                    messages,
                },
            );
        }
    }
}
