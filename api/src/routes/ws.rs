use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::SEC_WEBSOCKET_PROTOCOL;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use shared::entity::vendors;
use tokio::sync::broadcast::error::RecvError;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::state::{AppState, PaymentEvent};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/ws/payment-requests/", get(payment_requests))
}

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
    pub access_token: Option<String>,
}

/// Token offered through `Sec-WebSocket-Protocol`, either as `jwt.<token>`
/// or as the pair `jwt, <token>`, plus the protocol to echo back.
pub fn protocol_token(headers: &HeaderMap) -> Option<(String, String)> {
    let offered: Vec<&str> = headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    for (i, protocol) in offered.iter().enumerate() {
        if let Some(token) = protocol.strip_prefix("jwt.") {
            return Some((token.to_string(), protocol.to_string()));
        }
        if *protocol == "jwt" {
            if let Some(token) = offered.get(i + 1) {
                return Some((token.to_string(), "jwt".to_string()));
            }
        }
    }
    None
}

async fn payment_requests(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<SocketParams>,
) -> ApiResult<Response> {
    let (token, protocol) = match protocol_token(&headers) {
        Some((token, protocol)) => (token, Some(protocol)),
        None => (
            params.token.or(params.access_token).ok_or_else(ApiError::unauthorized)?,
            None,
        ),
    };
    let vendor = auth::authenticate(&state, &token).await?;
    let ws = match protocol {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };
    Ok(ws.on_upgrade(move |socket| serve(socket, state, vendor)))
}

fn visible_to(vendor: &vendors::Model, event: &PaymentEvent) -> bool {
    vendor.is_staff || event.request.vendor_id == vendor.id
}

async fn serve(mut socket: WebSocket, state: AppState, vendor: vendors::Model) {
    let mut events = state.events.subscribe();
    tracing::debug!(vendor_id = vendor.id, "payment request socket opened");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if visible_to(&vendor, &event) => {
                    let payload = json!({
                        "type": "payment_request",
                        "event": event.kind,
                        "data": event.request,
                    });
                    if socket.send(Message::Text(payload.to_string())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(vendor_id = vendor.id, skipped, "payment request socket lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(vendor_id = vendor.id, "payment request socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_from_protocol_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(protocol_token(&headers), None);

        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("jwt.abc123"));
        assert_eq!(
            protocol_token(&headers),
            Some(("abc123".to_string(), "jwt.abc123".to_string()))
        );

        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("jwt, abc123"));
        assert_eq!(protocol_token(&headers), Some(("abc123".to_string(), "jwt".to_string())));
    }
}
