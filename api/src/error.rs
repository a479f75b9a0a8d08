use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use shared::VendoraError;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] VendoraError),
    #[error("{detail}")]
    Invalid { detail: String, errors: Option<Value> },
    #[error("{0}")]
    Unauthorized(String),
    #[error("Request was throttled. Expected available in {0} seconds.")]
    Throttled(u64),
    #[error("Internal server error. {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        ApiError::Invalid {
            detail: detail.into(),
            errors: None,
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication credentials were not provided or are invalid.".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                VendoraError::Validation(_) | VendoraError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
                VendoraError::NotFound(_) => StatusCode::NOT_FOUND,
                VendoraError::Forbidden | VendoraError::Gated(_) => StatusCode::FORBIDDEN,
                VendoraError::Conflict(_) => StatusCode::CONFLICT,
                VendoraError::Database(_) | VendoraError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Invalid { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => match e {
                VendoraError::Validation(_) => "invalid",
                VendoraError::InvalidTransition(_) => "invalid_transition",
                VendoraError::NotFound(_) => "not_found",
                VendoraError::Forbidden => "permission_denied",
                VendoraError::Gated(_) => "plan_restricted",
                VendoraError::Conflict(_) => "conflict",
                VendoraError::Database(_) | VendoraError::Internal(_) => "server_error",
            },
            ApiError::Invalid { .. } => "invalid",
            ApiError::Unauthorized(_) => "not_authenticated",
            ApiError::Throttled(_) => "throttled",
            ApiError::Internal(_) => "server_error",
        }
    }

    fn detail(&self) -> String {
        match self {
            // Driver errors stay in the logs
            ApiError::Domain(VendoraError::Database(_) | VendoraError::Internal(_)) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        let errors = match &self {
            ApiError::Invalid { errors, .. } => errors.clone(),
            _ => None,
        };
        let body = json!({
            "detail": self.detail(),
            "errors": errors,
            "code": self.code(),
        });
        let mut response = (status, Json(body)).into_response();
        if let ApiError::Throttled(wait) = self {
            if let Ok(value) = HeaderValue::from_str(&wait.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Invalid {
            detail: "Invalid input.".to_string(),
            errors: serde_json::to_value(&errors).ok(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}
