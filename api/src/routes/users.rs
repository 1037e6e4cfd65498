use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use pulsefit_core::users::{UserProfile, UserProfileUpdate, fields};
use pulsefit_core::workouts;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::{Collection, DocumentStore, Filter, decode};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ResetProgressResponse {
    pub message: String,
    pub user: UserProfile,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/{user_id}", get(get_user).put(update_user))
        .route("/api/users/{user_id}/reset-progress", post(reset_progress))
}

/// Fetch a user or fail with 404.
pub(crate) async fn load_user(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<UserProfile, AppError> {
    store
        .find_entity(Collection::Users, &Filter::by_id(user_id))
        .await?
        .ok_or_else(|| AppError::user_not_found(user_id))
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            message: format!("{field} must not be empty"),
            field: Some(field.to_string()),
            received: Some(Value::String(value.to_string())),
            docs_hint: None,
        });
    }
    Ok(())
}

/// POST /api/users: create a profile
///
/// Counters start at zero and `id`/`joinDate` are generated when omitted.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserProfile,
    responses(
        (status = 200, description = "User created", body = UserProfile),
        (status = 400, description = "Missing or empty name/email", body = pulsefit_core::error::ApiError),
        (status = 409, description = "A user with this id already exists", body = pulsefit_core::error::ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(user): AppJson<UserProfile>,
) -> Result<Json<UserProfile>, AppError> {
    require_non_empty("name", &user.name)?;
    require_non_empty("email", &user.email)?;

    state.store.insert_entity(Collection::Users, &user).await?;
    tracing::info!(user_id = %user.id, "User created");
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(load_user(state.store.as_ref(), &user_id).await?))
}

/// PUT /api/users/{user_id}: partial profile update
///
/// Only `name`, `email`, `fitnessGoal` and `fitnessLevel` can be changed.
/// Counters move through workout completion and reset only.
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = UserProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "No updatable field present", body = pulsefit_core::error::ApiError),
        (status = 404, description = "User not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    AppJson(update): AppJson<UserProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let fields = update.into_fields();
    if fields.is_empty() {
        return Err(AppError::Validation {
            message: "No fields to update".to_string(),
            field: None,
            received: None,
            docs_hint: Some(
                "Send at least one of name, email, fitnessGoal, fitnessLevel.".to_string(),
            ),
        });
    }
    for field in ["name", "email"] {
        if let Some(Value::String(value)) = fields.get(field) {
            require_non_empty(field, value)?;
        }
    }

    let doc = state
        .store
        .update_fields(Collection::Users, &Filter::by_id(&user_id), fields)
        .await?
        .ok_or_else(|| AppError::user_not_found(&user_id))?;
    Ok(Json(decode(doc)?))
}

/// POST /api/users/{user_id}/reset-progress: start over
///
/// Zeroes the current streak and workout total and deletes every workout
/// log of the user. `longestStreak` and the workout plans are kept.
#[utoipa::path(
    post,
    path = "/api/users/{user_id}/reset-progress",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Progress reset", body = ResetProgressResponse),
        (status = 404, description = "User not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "users"
)]
pub async fn reset_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ResetProgressResponse>, AppError> {
    let mut zeroed = Map::new();
    zeroed.insert(fields::CURRENT_STREAK.to_string(), Value::from(0));
    zeroed.insert(fields::TOTAL_WORKOUTS.to_string(), Value::from(0));

    let doc = state
        .store
        .update_fields(Collection::Users, &Filter::by_id(&user_id), zeroed)
        .await?
        .ok_or_else(|| AppError::user_not_found(&user_id))?;

    let logs_deleted = state
        .store
        .delete_many(
            Collection::WorkoutLogs,
            &Filter::new().eq(workouts::fields::USER_ID, user_id.as_str()),
        )
        .await?;
    tracing::info!(user_id = %user_id, logs_deleted, "User progress reset");

    Ok(Json(ResetProgressResponse {
        message: "Progress reset successfully".to_string(),
        user: decode(doc)?,
    }))
}
