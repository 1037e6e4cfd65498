//! `AppJson<T>`: a `Json<T>` extractor whose rejections are `AppError`s.
//!
//! Every rejection kind gets its own mapping. Oversized bodies answer 413
//! so clients can tell "shrink the photo" apart from "fix the fields";
//! the rest are 400s that point at the offending field where serde names it.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};

use crate::error::AppError;

const SCHEMA_HINT: &str = "Compare the body with the endpoint schema at /api-doc/openapi.json.";

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| AppJson(value))
            .map_err(rejection_to_error)
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }

    let detail = rejection.body_text();
    let (field, docs_hint) = match &rejection {
        JsonRejection::MissingJsonContentType(_) => (
            "content-type".to_string(),
            "Send the body with `Content-Type: application/json`.",
        ),
        JsonRejection::JsonDataError(_) => (
            serde_field(&detail).unwrap_or_else(|| "body".to_string()),
            SCHEMA_HINT,
        ),
        _ => ("body".to_string(), SCHEMA_HINT),
    };

    AppError::Validation {
        message: format!("Invalid request body: {detail}"),
        field: Some(field),
        received: None,
        docs_hint: Some(docs_hint.to_string()),
    }
}

/// Field named in serde's "missing field `x`" / "unknown field `x`" messages.
fn serde_field(detail: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|pattern| {
            let after = &detail[detail.find(pattern)? + pattern.len()..];
            after.find('`').map(|end| after[..end].to_string())
        })
}
