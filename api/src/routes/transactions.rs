use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use shared::entity::{orders, transactions};
use shared::services::transaction_service::TransactionPatch;

use crate::auth::AuthVendor;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, MultipartForm};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/transactions/", get(list))
        .route("/api/v1/transactions/:id/", get(retrieve).patch(update))
        .route("/api/v1/transactions/:id/complete/", post(complete))
}

#[derive(Debug, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: transactions::Model,
    pub order: orders::Model,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> ApiResult<ApiJson<Vec<TransactionDetail>>> {
    let rows = state.services.transactions.list(&vendor, filter.status.as_deref()).await?;
    Ok(ApiJson(
        rows.into_iter()
            .map(|(transaction, order)| TransactionDetail { transaction, order })
            .collect(),
    ))
}

async fn retrieve(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<ApiJson<TransactionDetail>> {
    let (transaction, order) = state.services.transactions.get_for_vendor(&vendor, id).await?;
    Ok(ApiJson(TransactionDetail { transaction, order }))
}

async fn update(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    ApiJson(patch): ApiJson<TransactionPatch>,
) -> ApiResult<ApiJson<transactions::Model>> {
    Ok(ApiJson(state.services.transactions.update(&vendor, id, patch).await?))
}

/// Multipart: `status` (`completed` or `declined`) and an optional `proof`.
async fn complete(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> ApiResult<ApiJson<transactions::Model>> {
    let mut form = MultipartForm::read(multipart).await?;
    let status = form
        .field("status")
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid("Invalid status"))?;
    let proof = form.take_file("proof");
    let txn = state
        .services
        .transactions
        .complete(&vendor, id, &status, proof)
        .await?;
    Ok(ApiJson(txn))
}
