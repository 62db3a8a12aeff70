//! Presence socket at `/ws`.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws` (optionally `?token=<bearer token>`)
//! 2. Client sends `{"event":"register","data":{accountId, role, displayName}}`
//! 3. Server binds the connection in the presence registry and answers `registration_confirmed`
//! 4. Appointment events are pushed until the socket closes
//! 5. On close the binding is dropped, unless a newer connection has replaced it

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use hms_core::constants::PRESENCE_CHANNEL_CAPACITY;
use hms_core::models::Role;
use hms_core::presence::{
    ClientEvent, ConnectionId, RegisterPayload, Registration, RegistrationConfirmed, ServerEvent,
};
use hms_core::RecordId;
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// A `token` query parameter, when present, must be valid and pins the connection to that
/// account; registrations for any other account are refused.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let pinned = match query.token.as_deref() {
        Some(token) => Some(state.tokens.verify(token)?.sub),
        None => None,
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, pinned)))
}

async fn handle_socket(socket: WebSocket, state: AppState, pinned: Option<String>) {
    let connection = state.presence.next_connection_id();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(PRESENCE_CHANNEL_CAPACITY);

    tracing::debug!(%connection, "socket connected");

    // Channel -> socket. Ends once every sender, including the registry's copy, is gone.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode server event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let reply = handle_text(&state, connection, &tx, pinned.as_deref(), &text);
                if let Some(event) = reply {
                    let _ = tx.try_send(event);
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    if let Some(account) = state.presence.unregister(connection) {
        tracing::info!(%account, %connection, "account went offline");
    }
    drop(tx);
    let _ = writer.await;
    tracing::debug!(%connection, "socket closed");
}

/// Handles one client message and returns the direct reply, if any.
fn handle_text(
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<ServerEvent>,
    pinned: Option<&str>,
    text: &str,
) -> Option<ServerEvent> {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%connection, error = %e, "malformed client message");
            return Some(ServerEvent::error("Unrecognised message"));
        }
    };

    match event {
        ClientEvent::Register(payload) => Some(
            register(state, connection, tx, pinned, payload)
                .unwrap_or_else(ServerEvent::error),
        ),
    }
}

fn register(
    state: &AppState,
    connection: ConnectionId,
    tx: &mpsc::Sender<ServerEvent>,
    pinned: Option<&str>,
    payload: RegisterPayload,
) -> Result<ServerEvent, String> {
    let account_id = RecordId::parse(payload.account_id.trim())
        .map_err(|_| "accountId is not a valid account id".to_string())?;
    if pinned.is_some_and(|sub| sub != account_id.to_string()) {
        return Err("accountId does not match the token".into());
    }

    let account = state
        .accounts
        .get(&account_id)
        .ok()
        .filter(|a| a.is_active)
        .ok_or_else(|| "Unknown or inactive account".to_string())?;
    let role: Role = payload
        .role
        .parse()
        .map_err(|_| format!("Unknown role: {}", payload.role))?;
    if role != account.role() {
        return Err("role does not match the account".into());
    }

    let display_name = payload
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| account.full_name());

    let displaced = state.presence.register(
        connection,
        Registration {
            account_id: account.id.clone(),
            role,
            display_name,
        },
        tx.clone(),
    );
    tracing::info!(account = %account.id, %connection, displaced = ?displaced, "account registered for notifications");

    Ok(ServerEvent::RegistrationConfirmed(RegistrationConfirmed {
        account_id: account.id,
        role,
        connected_at: Utc::now(),
    }))
}
