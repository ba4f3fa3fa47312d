use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("user {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn email_taken() -> Self {
        Self::Conflict("Email already registered".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            // Kept at 400 for compatibility with existing clients.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation { field, message } => ErrorBody {
                detail: message,
                field: Some(field),
            },
            AppError::Conflict(message) => ErrorBody {
                detail: message,
                field: None,
            },
            AppError::NotFound(_) => ErrorBody {
                detail: "User not found".into(),
                field: None,
            },
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                ErrorBody {
                    detail: "Internal server error".into(),
                    field: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

// Malformed input is a client error with field detail, never a bare 400/415.

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        AppError::validation("body", r.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::validation("user_id", r.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        AppError::validation("query", r.body_text())
    }
}
