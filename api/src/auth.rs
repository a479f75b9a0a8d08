//! JWT access/refresh tokens for vendors.
//!
//! Tokens are HS256 signed with `JWT_SECRET`. The access token is sent as
//! `Authorization: Bearer <token>`; streaming endpoints also accept it as a
//! `?token=` query parameter because browsers cannot set headers there.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::entity::vendors;
use shared::{Config, VendoraError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue(config: &Config, vendor_id: i32, kind: TokenKind) -> ApiResult<String> {
    let now = Utc::now();
    let ttl = match kind {
        TokenKind::Access => Duration::minutes(config.jwt_access_minutes),
        TokenKind::Refresh => Duration::days(config.jwt_refresh_days),
    };
    let claims = Claims {
        sub: vendor_id.to_string(),
        kind,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("could not sign token: {}", e)))
}

pub fn issue_pair(config: &Config, vendor_id: i32) -> ApiResult<TokenPair> {
    Ok(TokenPair {
        access: issue(config, vendor_id, TokenKind::Access)?,
        refresh: issue(config, vendor_id, TokenKind::Refresh)?,
    })
}

/// Vendor id carried by a valid token of the expected kind.
pub fn verify(config: &Config, token: &str, kind: TokenKind) -> ApiResult<i32> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!("rejected token: {}", e);
        ApiError::Unauthorized("Given token not valid for any token type".to_string())
    })?;
    if data.claims.kind != kind {
        return Err(ApiError::Unauthorized("Token has wrong type".to_string()));
    }
    data.claims.sub.parse().map_err(|_| ApiError::unauthorized())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Loads the active vendor behind an access token.
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<vendors::Model> {
    let vendor_id = verify(state.config(), token, TokenKind::Access)?;
    let vendor = match state.services.vendors.get(vendor_id).await {
        Ok(vendor) => vendor,
        Err(VendoraError::NotFound(_)) => return Err(ApiError::Unauthorized("User not found".to_string())),
        Err(e) => return Err(e.into()),
    };
    if !vendor.is_active {
        return Err(ApiError::Unauthorized("User is inactive".to_string()));
    }
    Ok(vendor)
}

/// The vendor making the request.
pub struct AuthVendor(pub vendors::Model);

#[async_trait]
impl FromRequestParts<AppState> for AuthVendor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        Ok(AuthVendor(authenticate(state, token).await?))
    }
}
