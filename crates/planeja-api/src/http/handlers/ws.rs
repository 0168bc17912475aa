//! WebSocket endpoint for real-time chat stream events.
//!
//! `/ws?token=<access token>` upgrades the connection after verifying the
//! token, subscribes the socket to the subject's broker channel, and
//! forwards every event as a JSON text frame.
//!
//! A lagged receiver (client too slow for the token rate) logs a warning
//! and keeps receiving; it misses some tokens but the `done` event carries
//! the full text. Disconnecting only drops the subscription: in-flight
//! turn persistence is never affected.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use planeja_core::auth::service::TokenService;
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsParams {
    token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    // Browsers cannot set headers on WebSocket upgrades, so the access
    // token arrives as a query parameter.
    let claims = state.signer.verify_access(&params.token)?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, state, claims.sub)))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState, subject_id: Uuid) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events = state.broker.subscribe(subject_id);
    tracing::debug!(%subject_id, "websocket subscribed to chat stream");

    loop {
        tokio::select! {
            event_result = events.recv() => {
                match event_result {
                    Ok(event) => {
                        match serde_json::to_string(&event) {
                            Ok(frame) => {
                                if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                                    // Client disconnected
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, "failed to serialize stream event");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            %subject_id,
                            skipped,
                            "websocket subscriber lagged, skipping {skipped} events"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        if is_ping(&text)
                            && ws_sender
                                .send(Message::Text(r#"{"type":"pong"}"#.into()))
                                .await
                                .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "websocket receive error");
                        break;
                    }
                    // Binary and protocol ping/pong frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(%subject_id, "websocket connection closed");
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Ping,
}

fn is_ping(text: &str) -> bool {
    matches!(serde_json::from_str(text), Ok(ClientFrame::Ping))
}
