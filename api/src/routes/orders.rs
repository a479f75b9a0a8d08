use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::domain::OrderType;
use shared::entity::{orders, transactions};
use shared::models::{AcceptOrder, NewOrder, OrderFilter, SweepReport};

use crate::auth::AuthVendor;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/orders/", get(list).post(create))
        .route("/api/v1/orders/expire-overdue/", post(expire_overdue))
        .route("/api/v1/orders/:id/", get(retrieve))
        .route("/api/v1/orders/:id/accept/", post(accept))
        .route("/api/v1/orders/:id/decline/", post(decline))
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub results: Vec<T>,
}

async fn list(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<ApiJson<Page<orders::Model>>> {
    let (count, results) = state.services.orders.list(&vendor, &filter).await?;
    Ok(ApiJson(Page { count, results }))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub asset: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub amount: Decimal,
    pub rate: Option<Decimal>,
    pub customer_chat_id: Option<i64>,
    pub customer_name: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    let order_type: OrderType = body.order_type.parse().map_err(ApiError::invalid)?;
    let input = NewOrder {
        asset: body.asset,
        order_type,
        amount: body.amount,
        rate: body.rate,
        customer_chat_id: body.customer_chat_id,
        customer_name: body.customer_name,
    };
    let order = state.services.orders.create(&vendor, input).await?;
    Ok((StatusCode::CREATED, ApiJson(order)))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: orders::Model,
    pub transaction: Option<transactions::Model>,
}

async fn retrieve(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<ApiJson<OrderDetail>> {
    let order = state.services.orders.get_for_vendor(&vendor, id).await?;
    let transaction = state.services.transactions.for_order(order.id).await?;
    Ok(ApiJson(OrderDetail { order, transaction }))
}

async fn accept(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    body: Option<ApiJson<AcceptOrder>>,
) -> ApiResult<ApiJson<OrderDetail>> {
    let input = body.map(|ApiJson(b)| b).unwrap_or_default();
    let (order, txn) = state.services.orders.accept(&vendor, id, input).await?;
    Ok(ApiJson(OrderDetail {
        order,
        transaction: Some(txn),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    pub rejection_reason: Option<String>,
}

async fn decline(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    body: Option<ApiJson<DeclineRequest>>,
) -> ApiResult<ApiJson<OrderDetail>> {
    let reason = body.and_then(|ApiJson(b)| b.rejection_reason);
    let (order, txn) = state.services.orders.decline(&vendor, id, reason).await?;
    Ok(ApiJson(OrderDetail {
        order,
        transaction: Some(txn),
    }))
}

/// Sweeps the caller's overdue orders now instead of waiting for the worker.
async fn expire_overdue(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
) -> ApiResult<ApiJson<SweepReport>> {
    let scope = if vendor.is_staff { None } else { Some(vendor.id) };
    Ok(ApiJson(state.services.orders.expire_overdue(scope, Utc::now()).await?))
}
