use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::gating::GateDenial;

#[derive(Debug, Error)]
pub enum VendoraError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("{}", .0.vendor_message())]
    Gated(GateDenial),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("{0}")]
    Internal(String),
}

pub type VendoraResult<T> = Result<T, VendoraError>;

impl VendoraError {
    pub fn not_found(what: &str) -> Self {
        VendoraError::NotFound(format!("{} not found.", what))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        VendoraError::Validation(msg.into())
    }
}

/// True when the error is a unique index violation reported by the driver.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl From<GateDenial> for VendoraError {
    fn from(denial: GateDenial) -> Self {
        VendoraError::Gated(denial)
    }
}
