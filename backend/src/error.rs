//! Error handling for the Farm Records Platform
//!
//! Every failure reaches the client as `{ "error": { "code", "message", "field"? } }`
//! with a machine-readable code.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{GridError, MutationError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Farm and plot errors
    #[error("No matching plots: {0:?}")]
    NoPlotsFound(Vec<u32>),

    #[error("Area invariant violated: {0}")]
    InvariantDrift(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a named request field
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// The farm changed since the caller loaded it
    pub fn stale_revision(expected: i64) -> Self {
        AppError::Conflict {
            resource: "farm".to_string(),
            message: format!(
                "Farm was modified by another request (expected revision {}). Reload and retry.",
                expected
            ),
        }
    }
}

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::PlotNotFound(plot_number) => {
                AppError::NotFound(format!("Plot {}", plot_number))
            }
            MutationError::NoPlotsFound(requested) => AppError::NoPlotsFound(requested),
        }
    }
}

impl From<GridError> for AppError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::InvalidDimensions { .. } => AppError::invalid("grid", err.to_string()),
            GridError::InvalidTotalSize => AppError::invalid("totalSize", err.to_string()),
            GridError::InvariantDrift { .. } => AppError::InvariantDrift(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

/// `Json` body extractor whose rejections use the API error shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::NoPlotsFound(requested) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NO_PLOTS_FOUND".to_string(),
                    message: format!("None of the requested plots exist: {:?}", requested),
                    field: Some("plotNumbers".to_string()),
                },
            ),
            AppError::InvariantDrift(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVARIANT_DRIFT".to_string(),
                    message: msg.clone(),
                    field: Some("plots".to_string()),
                },
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: message.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_errors_map_to_distinct_kinds() {
        let not_found: AppError = MutationError::PlotNotFound(12).into();
        assert!(matches!(not_found, AppError::NotFound(ref what) if what == "Plot 12"));

        let none: AppError = MutationError::NoPlotsFound(vec![99]).into();
        assert_eq!(none.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_grid_errors_map_to_status() {
        let invalid: AppError = GridError::InvalidTotalSize.into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let drift: AppError = GridError::InvariantDrift {
            allocated: rust_decimal::Decimal::from(12),
            total_size: rust_decimal::Decimal::from(10),
        }
        .into();
        assert_eq!(drift.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            AppError::stale_revision(3).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
