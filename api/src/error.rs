use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulsefit_core::error::{self, ApiError};

use crate::store::StoreError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Referenced user or workout does not exist (404)
    NotFound { resource: String },
    /// Request conflicts with the current document state (409)
    Conflict {
        message: String,
        docs_hint: Option<String>,
    },
    /// Request body over the route's size limit (413)
    PayloadTooLarge,
    /// Persistence failure (500)
    Store(StoreError),
}

impl AppError {
    pub fn user_not_found(user_id: &str) -> Self {
        Self::NotFound {
            resource: format!("User {user_id}"),
        }
    }

    pub fn workout_not_found(workout_id: &str) -> Self {
        Self::NotFound {
            resource: format!("Workout {workout_id}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Conflict { message, docs_hint } => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::CONFLICT.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ApiError {
                    error: error::codes::PAYLOAD_TOO_LARGE.to_string(),
                    message: "Request body exceeds the size limit for this endpoint".to_string(),
                    field: Some("body".to_string()),
                    received: None,
                    request_id,
                    docs_hint: Some(
                        "Downscale or recompress images before encoding them.".to_string(),
                    ),
                },
            ),
            AppError::Store(err) => {
                tracing::error!(request_id = %request_id, "Store error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, internal_error(request_id))
            }
        };

        (status, Json(api_error)).into_response()
    }
}

fn internal_error(request_id: String) -> ApiError {
    ApiError {
        error: error::codes::INTERNAL_ERROR.to_string(),
        message: "An internal error occurred".to_string(),
        field: None,
        received: None,
        request_id,
        docs_hint: None,
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { collection, id } => AppError::Conflict {
                message: format!("A document with id '{id}' already exists in {collection}"),
                docs_hint: Some(
                    "Omit `id` to let the server generate one, or use a new identifier."
                        .to_string(),
                ),
            },
            other => AppError::Store(other),
        }
    }
}
