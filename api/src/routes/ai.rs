use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use pulsefit_core::ai::{FormCheckRequest, RestDayRequest, WorkoutRecommendationRequest};
use pulsefit_core::prompts;
use pulsefit_core::workouts::{WorkoutLog, fields};
use serde_json::Value;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::users::load_user;
use crate::state::AppState;
use crate::store::{Collection, DocumentStore, Filter, FindOptions};

/// Body cap for form-check uploads. Phone photos run several MiB and grow
/// by a third once base64 encoded; other routes keep axum's 2 MiB default.
pub const FORM_CHECK_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Accepts padded and unpadded input alike.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ai/workout-recommendations", post(workout_recommendations))
        .route(
            "/api/ai/form-check",
            post(form_check).layer(DefaultBodyLimit::max(FORM_CHECK_BODY_LIMIT)),
        )
        .route("/api/ai/rest-day-suggestion", post(rest_day_suggestion))
}

async fn recent_logs(
    store: &dyn DocumentStore,
    user_id: &str,
    limit: i64,
) -> Result<Vec<WorkoutLog>, AppError> {
    Ok(store
        .find_entities(
            Collection::WorkoutLogs,
            &Filter::new().eq(fields::USER_ID, user_id),
            FindOptions::newest_first(fields::COMPLETED_AT).limit(limit),
        )
        .await?)
}

/// POST /api/ai/workout-recommendations: three suggested plans
///
/// Always 200 for a known user. When the model fails or answers without
/// usable JSON the body is `{"recommendations": [], "error": ...}`.
#[utoipa::path(
    post,
    path = "/api/ai/workout-recommendations",
    request_body = WorkoutRecommendationRequest,
    responses(
        (status = 200, description = "Model result or fallback", body = Object),
        (status = 404, description = "User not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "ai"
)]
pub async fn workout_recommendations(
    State(state): State<AppState>,
    AppJson(req): AppJson<WorkoutRecommendationRequest>,
) -> Result<Json<Value>, AppError> {
    let store = state.store.as_ref();
    let user = load_user(store, &req.user_id).await?;
    let recent = recent_logs(store, &user.id, prompts::RECOMMENDATION_HISTORY).await?;

    let task = prompts::workout_recommendations(&user, &recent);
    Ok(Json(crate::ai::run(state.model.as_ref(), task).await))
}

/// POST /api/ai/form-check: score an exercise photo
///
/// `image_base64` may be bare base64 or a `data:` URL.
#[utoipa::path(
    post,
    path = "/api/ai/form-check",
    request_body = FormCheckRequest,
    responses(
        (status = 200, description = "Model result or fallback", body = Object),
        (status = 400, description = "Missing exercise name or unreadable image", body = pulsefit_core::error::ApiError),
        (status = 413, description = "Upload larger than the form-check body limit", body = pulsefit_core::error::ApiError)
    ),
    tag = "ai"
)]
pub async fn form_check(
    State(state): State<AppState>,
    AppJson(req): AppJson<FormCheckRequest>,
) -> Result<Json<Value>, AppError> {
    let exercise_name = req.exercise_name.trim();
    if exercise_name.is_empty() {
        return Err(AppError::Validation {
            message: "exercise_name must not be empty".to_string(),
            field: Some("exercise_name".to_string()),
            received: Some(Value::String(req.exercise_name.clone())),
            docs_hint: None,
        });
    }
    let image = validate_image(&req.image_base64)?;

    let task = prompts::form_check(exercise_name, image);
    Ok(Json(crate::ai::run(state.model.as_ref(), task).await))
}

/// Canonical padded base64 of an uploaded image.
///
/// Accepts a `data:` URL, missing padding and line-wrapped input, and
/// re-encodes so the model client always sees standard base64.
fn validate_image(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    let payload = match raw.strip_prefix("data:") {
        Some(data_url) => data_url
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or_default(),
        None => raw,
    };
    let payload: String = payload.split_whitespace().collect();

    let invalid = |message: &str| AppError::Validation {
        message: message.to_string(),
        field: Some("image_base64".to_string()),
        received: None,
        docs_hint: Some("Send the photo as base64, optionally as a data: URL.".to_string()),
    };

    if payload.is_empty() {
        return Err(invalid("image_base64 must not be empty"));
    }
    let bytes = LENIENT_BASE64
        .decode(&payload)
        .map_err(|_| invalid("image_base64 is not valid base64"))?;
    Ok(STANDARD.encode(bytes))
}

/// POST /api/ai/rest-day-suggestion: should the user rest today?
#[utoipa::path(
    post,
    path = "/api/ai/rest-day-suggestion",
    request_body = RestDayRequest,
    responses(
        (status = 200, description = "Model result or fallback", body = Object),
        (status = 404, description = "User not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "ai"
)]
pub async fn rest_day_suggestion(
    State(state): State<AppState>,
    AppJson(req): AppJson<RestDayRequest>,
) -> Result<Json<Value>, AppError> {
    let store = state.store.as_ref();
    let user = load_user(store, &req.user_id).await?;
    let recent = recent_logs(store, &user.id, prompts::REST_DAY_HISTORY).await?;

    let task = prompts::rest_day(&user, &recent);
    Ok(Json(crate::ai::run(state.model.as_ref(), task).await))
}
