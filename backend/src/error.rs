//! Application error types and HTTP response mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidStateTransition { from: String, to: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Error detail included in JSON error responses
#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::Conflict { .. }
            | AppError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_detail(&self) -> ErrorDetail {
        match self {
            AppError::Validation { field, message } => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: message.clone(),
                field: Some(field.clone()),
            },
            AppError::ValidationError(message) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message: message.clone(),
                field: None,
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message: format!("{} not found", resource),
                field: None,
            },
            AppError::DuplicateEntry(message) => ErrorDetail {
                code: "DUPLICATE_ENTRY".to_string(),
                message: message.clone(),
                field: None,
            },
            AppError::Conflict { resource, message } => ErrorDetail {
                code: "CONFLICT".to_string(),
                message: format!("{}: {}", resource, message),
                field: None,
            },
            AppError::InvalidStateTransition { from, to } => ErrorDetail {
                code: "INVALID_STATUS_TRANSITION".to_string(),
                message: format!("Cannot move job from '{}' to '{}'", from, to),
                field: Some("status".to_string()),
            },
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                }
            }
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal error occurred".to_string(),
                    field: None,
                }
            }
            AppError::InternalError(err) => {
                tracing::error!("Internal error: {:?}", err);
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal error occurred".to_string(),
                    field: None,
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.error_detail();

        let body = Json(json!({
            "error": detail,
        }));

        (status, body).into_response()
    }
}

/// Convenience result type for handlers and services
pub type AppResult<T> = Result<T, AppError>;

/// True when the error is a Postgres unique constraint violation (23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// True when the error is a Postgres foreign key violation (23503)
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}
