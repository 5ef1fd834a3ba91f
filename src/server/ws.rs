use crate::state::{AppState, WsMessage};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// First message a client sees: the latest run if one exists, otherwise a ready prompt.
fn greeting(state: &AppState) -> WsMessage {
    match state.latest_run() {
        Some(run) => WsMessage::SimulationComplete {
            run_id: run.run_id.clone(),
            samples: run.visualization_data.len(),
            option_price: run.analytics.option_price,
            execution_time_seconds: run.analytics.statistics.execution_time_seconds,
        },
        None => WsMessage::status("Ready. Click \"Run Simulation\" to start."),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.ws_tx.subscribe();

    if let Ok(json) = serde_json::to_string(&greeting(&state)) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    // Forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        loop {
            let ws_msg = match rx.recv().await {
                Ok(m) => m,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "ws client lagging, dropped messages");
                    continue;
                }
                Err(_) => break,
            };
            let Ok(json) = serde_json::to_string(&ws_msg) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Read (and discard) incoming messages; detect disconnect
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    tracing::debug!("ws client disconnected");
}
