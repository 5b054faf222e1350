// WebSocket handler for live game event streaming.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::events::GameEvent;
use crate::metrics;
use crate::store::SessionStore;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Only forward events of this game. Omit to follow every game.
    pub game_id: Option<Uuid>,
}

/// WebSocket upgrade handler for game event streaming.
pub async fn ws_games<S: SessionStore>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<S>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query.game_id))
}

fn wanted(event: &GameEvent, filter: Option<Uuid>) -> bool {
    filter.map_or(true, |id| event.game_id() == id)
}

async fn handle_ws<S: SessionStore>(mut socket: WebSocket, state: AppState<S>, filter: Option<Uuid>) {
    let mut rx = state.events.subscribe();
    metrics::CONNECTED_WEBSOCKETS.inc();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !wanted(&event, filter) {
                            continue;
                        }
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::error!("Failed to serialize event: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                        metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket client lagged, skipped {n} events");
                    }
                }
            }
            // Clients only listen; their messages just tell us they left.
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    metrics::CONNECTED_WEBSOCKETS.dec();
}
