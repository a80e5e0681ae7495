use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use auth_core::{AuthError, TokenValidator};

#[derive(Clone)]
pub struct GatewayState {
    pub validator: Arc<dyn TokenValidator>,
    pub hub_ws_url: String,
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

fn extract_token(headers: &HeaderMap, query_token: Option<String>) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or(query_token)
        .filter(|t| !t.is_empty())
}

/// Pre-validates the bearer token so unauthenticated clients never reach
/// the hub, then bridges the upgraded socket to it.
pub async fn ws_proxy(
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(token) = extract_token(&headers, params.token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if let Err(e) = state.validator.validate_token(&token).await {
        return match e {
            AuthError::Banned { reason, at } => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "banned", "reason": reason, "banned_at": at })),
            )
                .into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        };
    }
    let Some(ws) = ws else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let hub_ws_url = state.hub_ws_url.clone();
    ws.on_upgrade(move |client| bridge(client, hub_ws_url, token))
}

async fn bridge(client: WebSocket, hub_ws_url: String, token: String) {
    let Some(request) = hub_request(&hub_ws_url, &token) else {
        tracing::warn!("could not build hub upgrade request");
        close_with_error(client).await;
        return;
    };
    let upstream = match connect_async(request).await {
        Ok((upstream, _)) => upstream,
        Err(e) => {
            tracing::warn!(error = %e, "hub connect failed");
            close_with_error(client).await;
            return;
        }
    };

    let (mut up_sink, mut up_stream) = upstream.split();
    let (mut client_sink, mut client_stream) = client.split();

    let to_upstream = async {
        while let Some(Ok(message)) = client_stream.next().await {
            if up_sink.send(into_upstream(message)).await.is_err() {
                break;
            }
        }
    };
    let to_client = async {
        while let Some(Ok(message)) = up_stream.next().await {
            let Some(message) = into_client(message) else {
                continue;
            };
            if client_sink.send(message).await.is_err() {
                break;
            }
        }
    };

    // Either side closing tears the bridge down.
    tokio::select! {
        _ = to_upstream => {},
        _ = to_client => {},
    }
}

fn hub_request(
    hub_ws_url: &str,
    token: &str,
) -> Option<tokio_tungstenite::tungstenite::handshake::client::Request> {
    let mut request = hub_ws_url.into_client_request().ok()?;
    let value = format!("Bearer {token}").parse().ok()?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Some(request)
}

async fn close_with_error(mut client: WebSocket) {
    let _ = client
        .send(ClientMessage::Close(Some(CloseFrame {
            code: 1011,
            reason: "upstream unavailable".into(),
        })))
        .await;
}

fn into_upstream(message: ClientMessage) -> UpstreamMessage {
    match message {
        ClientMessage::Text(text) => UpstreamMessage::Text(text),
        ClientMessage::Binary(data) => UpstreamMessage::Binary(data),
        ClientMessage::Ping(data) => UpstreamMessage::Ping(data),
        ClientMessage::Pong(data) => UpstreamMessage::Pong(data),
        ClientMessage::Close(_) => UpstreamMessage::Close(None),
    }
}

fn into_client(message: UpstreamMessage) -> Option<ClientMessage> {
    match message {
        UpstreamMessage::Text(text) => Some(ClientMessage::Text(text)),
        UpstreamMessage::Binary(data) => Some(ClientMessage::Binary(data)),
        UpstreamMessage::Ping(data) => Some(ClientMessage::Ping(data)),
        UpstreamMessage::Pong(data) => Some(ClientMessage::Pong(data)),
        UpstreamMessage::Close(_) => Some(ClientMessage::Close(None)),
        UpstreamMessage::Frame(_) => None,
    }
}
