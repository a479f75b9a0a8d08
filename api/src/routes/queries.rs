use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use shared::entity::queries;
use shared::services::query_service::QueryPatch;

use crate::auth::AuthVendor;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/queries/", get(list))
        .route("/api/v1/queries/:id/", get(retrieve).patch(update))
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryFilter {
    pub status: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiQuery(filter): ApiQuery<QueryFilter>,
) -> ApiResult<ApiJson<Vec<queries::Model>>> {
    Ok(ApiJson(
        state.services.queries.list(vendor.id, filter.status.as_deref()).await?,
    ))
}

async fn retrieve(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<ApiJson<queries::Model>> {
    Ok(ApiJson(state.services.queries.get(vendor.id, id).await?))
}

async fn update(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    ApiJson(patch): ApiJson<QueryPatch>,
) -> ApiResult<ApiJson<queries::Model>> {
    Ok(ApiJson(state.services.queries.update(vendor.id, id, patch).await?))
}
