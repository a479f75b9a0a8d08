use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bot::Inbound;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/telegram/webhook/", post(webhook))
        .route("/api/v1/telegram/webhook/set/", post(set_webhook))
        .route("/api/v1/telegram/webhook/info/", get(webhook_info))
}

fn secret_matches(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.config().telegram_webhook_secret.as_deref() else {
        return true;
    };
    let got = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    got == expected.trim()
}

/// Telegram pushes every update here. Replies go out through the Telegram
/// client, so the response body only tells Telegram whether to retry.
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !secret_matches(&state, &headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "status": "forbidden" }))).into_response();
    }
    let update: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!("webhook body is not JSON: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "status": "error", "message": "Invalid JSON" })),
                )
                    .into_response();
            }
        }
    };

    let Some(inbound) = Inbound::from_json(&update) else {
        tracing::debug!("ignoring unsupported telegram update");
        return Json(json!({ "status": "ok" })).into_response();
    };
    match state.bot.handle(inbound).await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => {
            tracing::error!("webhook update failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SetWebhookRequest {
    pub webhook_url: Option<String>,
}

async fn set_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if !secret_matches(&state, &headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "status": "forbidden" }))).into_response();
    }
    let requested = serde_json::from_slice::<SetWebhookRequest>(&body)
        .ok()
        .and_then(|r| r.webhook_url)
        .filter(|u| !u.trim().is_empty());
    let Some(url) = requested.or_else(|| state.config().telegram_webhook_url.clone()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "webhook_url is required (or set TELEGRAM_WEBHOOK_URL)" })),
        )
            .into_response();
    };
    let secret = state.config().telegram_webhook_secret.clone();
    match state.services.telegram().set_webhook(url.trim(), secret.as_deref()).await {
        Ok(()) => {
            tracing::info!("telegram webhook set to {}", url.trim());
            Json(json!({ "status": "success", "message": "Webhook set successfully" })).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn webhook_info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !secret_matches(&state, &headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "status": "forbidden" }))).into_response();
    }
    match state.services.telegram().webhook_info().await {
        Ok(info) => Json(json!({
            "url": info.url.unwrap_or_default(),
            "pending_update_count": info.pending_update_count,
            "last_error_message": info.last_error_message,
        }))
        .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}
