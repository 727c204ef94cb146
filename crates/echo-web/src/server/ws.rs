//! WebSocket — forward journal events to connected clients.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::{error, info};

use echo_core::events::{JobsData, JournalEvent};

use super::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Current entries and in-flight count, so a fresh client can render
/// before the next mutation broadcasts anything.
async fn initial_events(state: &AppState) -> Vec<JournalEvent> {
    let entries = state.pipeline.entries().await;
    vec![
        JournalEvent::Entries(entries.as_ref().clone()),
        JournalEvent::Jobs(JobsData {
            in_flight: state.pipeline.jobs().in_flight_count(),
        }),
    ]
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before reading the snapshot so nothing falls in between.
    let mut rx = state.pipeline.subscribe();

    info!("WebSocket client connected");

    for event in initial_events(&state).await {
        let text = event.to_ws_json().to_string();
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Journal events -> client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if socket.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("Failed to serialize event: {}", e);
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // the next Entries event carries the full snapshot again
                        info!("WebSocket lagged {} events", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            // Incoming messages from client (keep-alive)
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
