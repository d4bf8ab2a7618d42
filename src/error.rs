use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DietError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid meal slot: {0}")]
    InvalidSlot(String),

    #[error("invalid meal entry: {0}")]
    InvalidEntry(&'static str),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("record was modified concurrently")]
    MergeConflict,

    #[error("record kept changing after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("stored meal history is not a valid document: {0}")]
    CorruptHistory(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl DietError {
    pub fn kind(&self) -> &'static str {
        match self {
            DietError::UserNotFound => "user_not_found",
            DietError::InvalidSlot(_) => "invalid_slot",
            DietError::InvalidEntry(_) => "invalid_entry",
            DietError::InvalidDate(_) => "invalid_date",
            DietError::MergeConflict => "merge_conflict",
            DietError::RetriesExhausted { .. } => "retries_exhausted",
            DietError::StorageUnavailable(_) => "storage_unavailable",
            DietError::CorruptHistory(_) => "corrupt_history",
            DietError::Storage(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DietError::UserNotFound => StatusCode::NOT_FOUND,
            DietError::InvalidSlot(_) | DietError::InvalidEntry(_) | DietError::InvalidDate(_) => {
                StatusCode::BAD_REQUEST
            }
            DietError::MergeConflict => StatusCode::CONFLICT,
            DietError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DietError::RetriesExhausted { .. }
            | DietError::CorruptHistory(_)
            | DietError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for DietError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => DietError::StorageUnavailable(e),
            other => DietError::Storage(other),
        }
    }
}

impl IntoResponse for DietError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
