use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::entity::rates;
use shared::models::RateInput;

use crate::auth::AuthVendor;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/rates/", get(list).post(create))
        .route(
            "/api/v1/rates/:id/",
            get(retrieve).put(replace).patch(update).delete(remove),
        )
}

async fn list(State(state): State<AppState>, AuthVendor(vendor): AuthVendor) -> ApiResult<ApiJson<Vec<rates::Model>>> {
    Ok(ApiJson(state.services.rates.list(vendor.id).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    ApiJson(input): ApiJson<RateInput>,
) -> ApiResult<impl IntoResponse> {
    let rate = state.services.rates.create(vendor.id, input).await?;
    Ok((StatusCode::CREATED, ApiJson(rate)))
}

async fn retrieve(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<ApiJson<rates::Model>> {
    Ok(ApiJson(state.services.rates.get(vendor.id, id).await?))
}

async fn replace(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    ApiJson(input): ApiJson<RateInput>,
) -> ApiResult<ApiJson<rates::Model>> {
    Ok(ApiJson(state.services.rates.update(vendor.id, id, input).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct RatePatch {
    pub asset: Option<String>,
    pub buy_rate: Option<Decimal>,
    pub sell_rate: Option<Decimal>,
    pub contract_address: Option<String>,
    pub bank_details: Option<String>,
}

impl RatePatch {
    fn merge(self, current: rates::Model) -> RateInput {
        RateInput {
            asset: self.asset.unwrap_or(current.asset),
            buy_rate: self.buy_rate.unwrap_or(current.buy_rate),
            sell_rate: self.sell_rate.unwrap_or(current.sell_rate),
            contract_address: self.contract_address.or(current.contract_address),
            bank_details: self.bank_details.or(current.bank_details),
        }
    }
}

async fn update(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
    ApiJson(patch): ApiJson<RatePatch>,
) -> ApiResult<ApiJson<rates::Model>> {
    let current = state.services.rates.get(vendor.id, id).await?;
    let input = patch.merge(current);
    Ok(ApiJson(state.services.rates.update(vendor.id, id, input).await?))
}

async fn remove(
    State(state): State<AppState>,
    AuthVendor(vendor): AuthVendor,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.services.rates.delete(vendor.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
