//! Service error taxonomy and the `{data, error}` response envelope.

use familyapp_core::CoreError;
use familyapp_store::{StoreError, Table};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(#[from] CoreError),

    #[error("{0}")]
    Store(StoreError),

    #[error("{table} {id} not found")]
    NotFound { table: Table, id: String },

    #[error("sign-in required: no owner id")]
    AuthRequired,
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { table, id } => ServiceError::NotFound { table, id },
            other => ServiceError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// What every service call hands back across the UI boundary: either
/// `data` or a user-facing `error` string, never a panic or a raw error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    /// Convert a service result, logging the failure under `op`.
    pub fn from_result(op: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                warn!(op, error = %e, "service call failed");
                Self::err(e.to_string())
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.data, self.error) {
            (_, Some(e)) => Err(e),
            (Some(d), None) => Ok(d),
            (None, None) => Err("empty response".to_string()),
        }
    }
}
