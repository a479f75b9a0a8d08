//! Fixed one-minute request windows per vendor (or client address).
//!
//! Every request counts against a base scope (`user`, `trial_user` or
//! `anon`); order creation, rate writes and token endpoints also count
//! against their own scope.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use shared::config::ThrottleRates;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    TrialUser,
    Anon,
    OrderWrite,
    RateWrite,
    AuthBurst,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::TrialUser => "trial_user",
            Scope::Anon => "anon",
            Scope::OrderWrite => "order_write",
            Scope::RateWrite => "rate_write",
            Scope::AuthBurst => "auth_burst",
        }
    }

    pub fn limit(&self, rates: &ThrottleRates) -> u32 {
        match self {
            Scope::User => rates.user,
            Scope::TrialUser => rates.trial_user,
            Scope::Anon => rates.anon,
            Scope::OrderWrite => rates.order_write,
            Scope::RateWrite => rates.rate_write,
            Scope::AuthBurst => rates.auth_burst,
        }
    }
}

fn is_exempt(path: &str) -> bool {
    ["/api/v1/health/", "/api/v1/metrics/", "/api/v1/telegram/", "/api/v1/stream/", "/api/v1/ws/"]
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// The extra scope a request counts against, if any.
pub fn write_scope(method: &Method, path: &str) -> Option<Scope> {
    let is_write = !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS);
    if path.starts_with("/api/v1/accounts/token/") || path == "/api/v1/accounts/signup/" {
        return Some(Scope::AuthBurst);
    }
    if *method == Method::POST && path == "/api/v1/orders/" {
        return Some(Scope::OrderWrite);
    }
    if is_write && path.starts_with("/api/v1/rates/") {
        return Some(Scope::RateWrite);
    }
    None
}

fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// True when the request is still within `scope`'s allowance.
async fn admit(state: &AppState, scope: Scope, ident: &str) -> bool {
    let limit = scope.limit(&state.config().throttle) as u64;
    let key = format!("throttle:{}:{}", scope.as_str(), ident);
    match state.services.ctx.cache.incr_window(&key, WINDOW).await {
        Ok(count) => count <= limit,
        Err(e) => {
            tracing::warn!("throttle cache unavailable, letting request through: {}", e);
            true
        }
    }
}

pub async fn throttle(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let vendor = match auth::bearer_token(request.headers()) {
        Some(token) => auth::authenticate(&state, token).await.ok(),
        None => None,
    };
    let (base, ident) = match &vendor {
        Some(v) if v.is_trial => (Scope::TrialUser, format!("user:{}:trial", v.id)),
        Some(v) => (Scope::User, format!("user:{}", v.id)),
        None => (Scope::Anon, format!("ip:{}", client_ip(&request))),
    };

    let mut scopes = vec![base];
    scopes.extend(write_scope(request.method(), &path));
    for scope in scopes {
        if !admit(&state, scope, &ident).await {
            state.metrics.record_throttled();
            tracing::info!(scope = scope.as_str(), ident = %ident, "request throttled");
            return ApiError::Throttled(WINDOW.as_secs()).into_response();
        }
    }
    next.run(request).await
}
