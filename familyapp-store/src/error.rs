use thiserror::Error;

use crate::table::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table} row {id} not found")]
    NotFound { table: Table, id: String },

    #[error("{table} row {id} already exists")]
    Conflict { table: Table, id: String },

    #[error("invalid {table} row: {reason}")]
    InvalidRow { table: Table, reason: String },

    #[error("failed to decode {table} row: {source}")]
    Decode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
