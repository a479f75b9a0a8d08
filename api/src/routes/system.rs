use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::extract::ApiQuery;
use crate::state::AppState;

const METRICS_HEADER: &str = "x-metrics-token";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health/", get(health))
        .route("/api/v1/metrics/", get(metrics))
}

pub fn version() -> String {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{}+{}", env!("CARGO_PKG_VERSION"), hash)
    }
}

async fn health(State(state): State<AppState>) -> Response {
    let db_ok = match state.services.db().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("health check database ping failed: {}", e);
            false
        }
    };
    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "db": db_ok,
        "time": Utc::now().to_rfc3339(),
        "host": std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
        "version": version(),
    }))
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsParams {
    pub token: Option<String>,
}

async fn metrics(State(state): State<AppState>, headers: HeaderMap, ApiQuery(params): ApiQuery<MetricsParams>) -> Response {
    if let Some(secret) = state.config().metrics_secret.as_deref() {
        let supplied = headers
            .get(METRICS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or(params.token);
        if supplied.as_deref() != Some(secret) {
            return (StatusCode::FORBIDDEN, Json(json!({ "detail": "Forbidden" }))).into_response();
        }
    }

    // Counts degrade to zero rather than failing the scrape
    let services = &state.services;
    let vendors_total = services.vendors.repo().count().await.unwrap_or(0);
    let rates_total = services.rates.count().await.unwrap_or(0);
    let orders_open = services.orders.count_open().await.unwrap_or(0);
    Json(json!({
        "uptime_seconds": state.metrics.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
        "vendors_total": vendors_total,
        "rates_total": rates_total,
        "orders_open": orders_open,
        "counters": {
            "throttle_429_total": state.metrics.throttled_total(),
        },
    }))
    .into_response()
}
