use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use shared::entity::notifications;

use crate::auth::AuthVendor;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/notifications/", get(list))
        .route("/api/v1/notifications/mark-read/", post(mark_read))
        .route("/api/v1/notifications/subscribe/", post(subscribe))
        .route("/api/v1/notifications/unsubscribe/", post(unsubscribe))
        .route("/api/v1/notifications/vapid-public-key/", get(vapid_public_key))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread: bool,
}

async fn list(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
) -> ApiResult<ApiJson<Vec<notifications::Model>>> {
    Ok(ApiJson(state.services.notifications.list(vendor.id, filter.unread).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<i32>>,
}

/// Without `ids` every unread notification is marked.
async fn mark_read(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    body: Option<ApiJson<MarkReadRequest>>,
) -> ApiResult<impl IntoResponse> {
    let ids = body.and_then(|ApiJson(b)| b.ids);
    let updated = state.services.notifications.mark_read(vendor.id, ids).await?;
    Ok(ApiJson(json!({ "updated": updated })))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Browser `PushSubscription.toJSON()` shape.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

async fn subscribe(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    headers: axum::http::HeaderMap,
    ApiJson(body): ApiJson<SubscribeRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let subscription = state
        .services
        .notifications
        .subscribe(vendor.id, &body.endpoint, &body.keys.p256dh, &body.keys.auth, user_agent)
        .await?;
    Ok((StatusCode::CREATED, ApiJson(json!({ "id": subscription.id }))))
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

async fn unsubscribe(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(body): ApiJson<UnsubscribeRequest>,
) -> ApiResult<impl IntoResponse> {
    let removed = state.services.notifications.unsubscribe(vendor.id, &body.endpoint).await?;
    Ok(ApiJson(json!({ "removed": removed })))
}

async fn vapid_public_key(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let key = state
        .config()
        .vapid_public_key
        .clone()
        .ok_or_else(|| ApiError::Domain(shared::VendoraError::not_found("VAPID public key")))?;
    Ok(ApiJson(json!({ "public_key": key })))
}
