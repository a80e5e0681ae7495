use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use auth_core::{AuthError, TokenValidator};
use event_schema::{user_channel, EventBus};

const READ_DEADLINE: Duration = Duration::from_secs(60);

/// Per-process registry of live sockets, one connection per user. A new
/// upgrade for the same user replaces the previous socket, which is told to
/// close. Multi-device delivery would need a per-device key here.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<Message>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn replace(&self, user_id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        let mut guard = self.inner.write().await;
        if let Some(old) = guard.insert(user_id, tx) {
            let _ = old.send(Message::Close(None));
        }
    }

    async fn remove(&self, user_id: Uuid, tx: &mpsc::UnboundedSender<Message>) {
        let mut guard = self.inner.write().await;
        if let Some(current) = guard.get(&user_id) {
            if current.same_channel(tx) {
                guard.remove(&user_id);
            }
        }
    }

    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }
}

#[derive(Clone)]
pub struct HubState {
    pub registry: ConnectionRegistry,
    pub validator: Arc<dyn TokenValidator>,
    pub bus: Arc<dyn EventBus>,
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Browsers cannot set headers on `WebSocket`, so the token is also
/// accepted as a query parameter.
pub fn extract_token(headers: &HeaderMap, query_token: Option<String>) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or(query_token)
        .filter(|t| !t.is_empty())
}

pub async fn ws_handler(
    State(state): State<HubState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    // Authentication is decided before the upgrade so plain-HTTP probes get
    // the same status codes.
    let Some(token) = extract_token(&headers, params.token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let info = match state.validator.validate_token(&token).await {
        Ok(info) => info,
        Err(AuthError::Banned { reason, at }) => {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "banned", "reason": reason, "banned_at": at })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "ws auth failed");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| handle_socket(state, info.user_id, socket)),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn handle_socket(state: HubState, user_id: Uuid, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Subscribe before registering so no event published after the
    // connection becomes visible can be missed.
    let mut events = match state.bus.subscribe(&user_channel(user_id)).await {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(error = %e, %user_id, "bus subscription failed");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };
    state.registry.replace(user_id, tx.clone()).await;
    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(payload) = events.recv().await {
            if forward_tx.send(Message::Text(payload)).is_err() {
                break;
            }
        }
    });
    tracing::debug!(%user_id, "ws connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(Message::Close(frame)) => {
                        let _ = sink.send(Message::Close(frame)).await;
                        break;
                    }
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = tokio::time::timeout(READ_DEADLINE, stream.next()) => {
                match inbound {
                    // Client frames are read only to keep the connection
                    // alive; payloads are discarded.
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(_))) | Err(_) => break,
                }
            }
        }
    }

    forwarder.abort();
    state.registry.remove(user_id, &tx).await;
    tracing::debug!(%user_id, "ws disconnected");
}
