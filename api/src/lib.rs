//! Vendora REST API: vendor dashboard endpoints, the Telegram webhook and
//! the background order expiry worker.

pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod throttle;
pub mod worker;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use shared::Config;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// CORS from `CORS_ALLOWED_ORIGINS`; any origin when unset.
pub fn build_cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(state.config());
    routes::api_routes()
        .layer(middleware::from_fn_with_state(state.clone(), throttle::throttle))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
