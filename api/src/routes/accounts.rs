use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::domain::Plan;
use shared::entity::{payment_requests, vendors};
use shared::models::{BankDetailInput, NewBroadcast, SubscriptionStatus, VendorUpdate};
use shared::VendoraError;
use validator::Validate;

use crate::auth::{self, AuthVendor, TokenKind};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, MultipartForm};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/accounts/signup/", post(signup))
        .route("/api/v1/accounts/token/", post(obtain_token))
        .route("/api/v1/accounts/token/refresh/", post(refresh_token))
        .route("/api/v1/accounts/vendors/me/", get(me).patch(update_me))
        .route("/api/v1/accounts/subscription/", get(subscription))
        .route("/api/v1/accounts/plan/upgrade/", post(upgrade_plan))
        .route("/api/v1/accounts/bank-details/", get(list_bank_details).post(add_bank_detail))
        .route("/api/v1/accounts/bank-details/:id/", delete(delete_bank_detail))
        .route("/api/v1/accounts/bank-details/:id/set-default/", post(set_default_bank_detail))
        .route(
            "/api/v1/accounts/payment-requests/",
            get(list_payment_requests).post(create_payment_request),
        )
        .route("/api/v1/accounts/payment-requests/latest/", get(latest_payment_request))
        .route("/api/v1/accounts/payment-requests/:id/approve/", post(approve_payment_request))
        .route("/api/v1/accounts/payment-requests/:id/reject/", post(reject_payment_request))
        .route("/api/v1/accounts/broadcasts/", get(list_broadcasts).post(create_broadcast))
        .route("/api/v1/accounts/broadcasts/:id/", delete(delete_broadcast))
        .route("/api/v1/accounts/broadcasts/:id/send-to-bot/", post(send_broadcast))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignupUser {
    id: i32,
    email: String,
    name: String,
    trial_expires_at: Option<DateTime<Utc>>,
    is_trial: bool,
}

async fn signup(State(state): State<AppState>, ApiJson(body): ApiJson<SignupRequest>) -> ApiResult<impl IntoResponse> {
    body.validate()?;
    if matches!(&body.password_confirm, Some(confirm) if *confirm != body.password) {
        return Err(ApiError::invalid("Passwords do not match."));
    }
    let vendor = state.services.vendors.signup(&body.email, &body.name, &body.password).await?;
    let user = SignupUser {
        id: vendor.id,
        email: vendor.email,
        name: vendor.name,
        trial_expires_at: vendor.trial_expires_at,
        is_trial: vendor.is_trial,
    };
    Ok((
        StatusCode::CREATED,
        ApiJson(json!({ "message": "Account created successfully!", "user": user })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> ApiResult<ApiJson<auth::TokenPair>> {
    let vendor = match state.services.vendors.authenticate(&body.email.trim().to_lowercase(), &body.password).await {
        Ok(vendor) => vendor,
        Err(VendoraError::Validation(msg)) => return Err(ApiError::Unauthorized(msg)),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(vendor_id = vendor.id, "token issued");
    Ok(ApiJson(auth::issue_pair(state.config(), vendor.id)?))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let vendor_id = auth::verify(state.config(), &body.refresh, TokenKind::Refresh)?;
    let vendor = match state.services.vendors.get(vendor_id).await {
        Ok(vendor) if vendor.is_active => vendor,
        Ok(_) | Err(VendoraError::NotFound(_)) => return Err(ApiError::unauthorized()),
        Err(e) => return Err(e.into()),
    };
    let access = auth::issue(state.config(), vendor.id, TokenKind::Access)?;
    Ok(ApiJson(json!({ "access": access })))
}

/// The vendor as returned by `vendors/me/`.
#[derive(Debug, Serialize)]
pub struct VendorProfile {
    #[serde(flatten)]
    pub vendor: vendors::Model,
    pub bot_link: Option<String>,
    pub subscription: SubscriptionStatus,
}

fn profile(state: &AppState, vendor: vendors::Model) -> VendorProfile {
    VendorProfile {
        bot_link: state.services.vendors.bot_link(&vendor),
        subscription: state.services.vendors.subscription_status(&vendor),
        vendor,
    }
}

async fn me(State(state): State<AppState>, AuthVendor(vendor): AuthVendor) -> ApiJson<VendorProfile> {
    ApiJson(profile(&state, vendor))
}

async fn update_me(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(patch): ApiJson<VendorUpdate>,
) -> ApiResult<ApiJson<VendorProfile>> {
    let vendor = state.services.vendors.update_profile(vendor.id, patch).await?;
    Ok(ApiJson(profile(&state, vendor)))
}

async fn subscription(State(state): State<AppState>, AuthVendor(vendor): AuthVendor) -> ApiJson<SubscriptionStatus> {
    ApiJson(state.services.vendors.subscription_status(&vendor))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpgradeRequest {
    pub plan: Option<String>,
    pub duration_days: Option<i64>,
}

async fn upgrade_plan(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(body): ApiJson<UpgradeRequest>,
) -> ApiResult<ApiJson<VendorProfile>> {
    let plan = match body.plan.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(raw) => raw.parse::<Plan>().map_err(ApiError::invalid)?,
        None => Plan::Monthly,
    };
    if !matches!(plan, Plan::Monthly | Plan::Yearly | Plan::Perpetual) {
        return Err(ApiError::invalid(format!("Cannot upgrade to the {} plan.", plan)));
    }
    let vendor = state.services.vendors.set_plan(vendor.id, plan, body.duration_days).await?;
    Ok(ApiJson(profile(&state, vendor)))
}

async fn list_bank_details(State(state): State<AppState>, AuthVendor(vendor): AuthVendor) -> ApiResult<impl IntoResponse> {
    Ok(ApiJson(state.services.vendors.list_bank_details(vendor.id).await?))
}

async fn add_bank_detail(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(body): ApiJson<BankDetailInput>,
) -> ApiResult<impl IntoResponse> {
    let detail = state.services.vendors.add_bank_detail(vendor.id, body).await?;
    Ok((StatusCode::CREATED, ApiJson(detail)))
}

async fn set_default_bank_detail(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(ApiJson(state.services.vendors.set_default_bank_detail(vendor.id, id).await?))
}

async fn delete_bank_detail(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.services.vendors.delete_bank_detail(vendor.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_payment_requests(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
) -> ApiResult<ApiJson<Vec<payment_requests::Model>>> {
    Ok(ApiJson(state.services.payments.list(&vendor).await?))
}

/// Multipart: optional `note` and `receipt` file.
async fn create_payment_request(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let note = form.field("note").map(str::to_string);
    let receipt = form.take_file("receipt");
    let request = state.services.payments.create(vendor.id, note, receipt).await?;
    state.events.publish("created", request.clone());
    Ok((StatusCode::CREATED, ApiJson(request)))
}

async fn latest_payment_request(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
) -> ApiResult<ApiJson<Option<payment_requests::Model>>> {
    Ok(ApiJson(state.services.payments.latest(vendor.id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub duration_days: Option<i64>,
}

async fn approve_payment_request(
    State(state): State<AppState>,
    AuthVendor(staff): AuthVendor,
    Path(id): Path<i32>,
    body: Option<ApiJson<ApproveRequest>>,
) -> ApiResult<impl IntoResponse> {
    let duration_days = body.and_then(|ApiJson(b)| b.duration_days);
    let (request, vendor) = state.services.payments.approve(&staff, id, duration_days).await?;
    state.events.publish("approved", request.clone());
    Ok(ApiJson(json!({
        "detail": "Approved and vendor activated",
        "request": request,
        "plan": vendor.plan,
        "plan_expires_at": vendor.plan_expires_at,
    })))
}

async fn reject_payment_request(
    State(state): State<AppState>,
    AuthVendor(staff): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let request = state.services.payments.reject(&staff, id).await?;
    state.events.publish("rejected", request.clone());
    Ok(ApiJson(json!({ "detail": "Rejected", "request": request })))
}

async fn list_broadcasts(State(state): State<AppState>, AuthVendor(vendor): AuthVendor) -> ApiResult<impl IntoResponse> {
    let results = state.services.broadcasts.list(vendor.id).await?;
    Ok(ApiJson(json!({ "count": results.len(), "results": results })))
}

async fn create_broadcast(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(body): ApiJson<NewBroadcast>,
) -> ApiResult<impl IntoResponse> {
    let broadcast = state.services.broadcasts.create(vendor.id, body).await?;
    Ok((StatusCode::CREATED, ApiJson(broadcast)))
}

async fn delete_broadcast(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.services.broadcasts.delete(vendor.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_broadcast(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let (broadcast, report) = state.services.broadcasts.send(vendor.id, id).await?;
    Ok(ApiJson(json!({
        "detail": "Message sent to bot successfully",
        "broadcast": broadcast,
        "recipients": report.recipients,
        "delivered": report.delivered,
    })))
}
