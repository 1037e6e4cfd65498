use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use pulsefit_core::users::{self, UserProfile};
use pulsefit_core::workouts::{CreateWorkoutPlan, WorkoutLog, WorkoutPlan, fields};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::{Collection, DocumentStore, Filter, FindOptions, decode};

/// Most plans returned by one list call.
const PLAN_LIST_LIMIT: i64 = 1000;
/// Most logs returned by one history call.
const LOG_LIST_LIMIT: i64 = 100;

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompleteWorkoutResponse {
    pub message: String,
    pub workout: WorkoutPlan,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users/{user_id}/workouts",
            get(list_workouts).post(create_workout),
        )
        .route("/api/users/{user_id}/workout-logs", get(list_workout_logs))
        .route("/api/workouts/{workout_id}/complete", put(complete_workout))
        .route("/api/workouts/{workout_id}", delete(delete_workout))
}

/// POST /api/users/{user_id}/workouts: add a plan
///
/// The owning user is not checked; plans may be created ahead of signup.
#[utoipa::path(
    post,
    path = "/api/users/{user_id}/workouts",
    params(("user_id" = String, Path, description = "Owning user")),
    request_body = CreateWorkoutPlan,
    responses(
        (status = 200, description = "Plan created", body = WorkoutPlan),
        (status = 400, description = "Malformed body", body = pulsefit_core::error::ApiError)
    ),
    tag = "workouts"
)]
pub async fn create_workout(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<CreateWorkoutPlan>,
) -> Result<Json<WorkoutPlan>, AppError> {
    let plan = WorkoutPlan::new(user_id, req);
    state.store.insert_entity(Collection::Workouts, &plan).await?;
    tracing::info!(
        workout_id = %plan.id,
        user_id = %plan.user_id,
        exercises = plan.exercises.len(),
        "Workout plan created"
    );
    Ok(Json(plan))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/workouts",
    params(("user_id" = String, Path, description = "Owning user")),
    responses((status = 200, description = "Plans of the user", body = Vec<WorkoutPlan>)),
    tag = "workouts"
)]
pub async fn list_workouts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<WorkoutPlan>>, AppError> {
    let plans = state
        .store
        .find_entities(
            Collection::Workouts,
            &Filter::new().eq(fields::USER_ID, user_id),
            FindOptions::default().limit(PLAN_LIST_LIMIT),
        )
        .await?;
    Ok(Json(plans))
}

/// PUT /api/workouts/{workout_id}/complete: mark a plan done
///
/// Flips `completed`, writes a log and bumps the owner's counters. A plan
/// can be completed once; repeats are rejected with 409 and change nothing.
#[utoipa::path(
    put,
    path = "/api/workouts/{workout_id}/complete",
    params(("workout_id" = String, Path, description = "Workout plan identifier")),
    responses(
        (status = 200, description = "Workout completed", body = CompleteWorkoutResponse),
        (status = 404, description = "Workout not found", body = pulsefit_core::error::ApiError),
        (status = 409, description = "Workout already completed", body = pulsefit_core::error::ApiError)
    ),
    tag = "workouts"
)]
pub async fn complete_workout(
    State(state): State<AppState>,
    Path(workout_id): Path<String>,
) -> Result<Json<CompleteWorkoutResponse>, AppError> {
    let store = state.store.as_ref();

    let mut completed = Map::new();
    completed.insert(fields::COMPLETED.to_string(), Value::Bool(true));
    let pending = Filter::by_id(&workout_id).eq(fields::COMPLETED, false);

    let Some(doc) = store
        .update_fields(Collection::Workouts, &pending, completed)
        .await?
    else {
        return Err(
            match store
                .find_one(Collection::Workouts, &Filter::by_id(&workout_id))
                .await?
            {
                Some(_) => AppError::Conflict {
                    message: format!("Workout {workout_id} is already completed"),
                    docs_hint: Some(
                        "Create a new plan to log the same workout again.".to_string(),
                    ),
                },
                None => AppError::workout_not_found(&workout_id),
            },
        );
    };
    let plan: WorkoutPlan = decode(doc)?;

    let log = WorkoutLog::for_completion(&plan);
    store.insert_entity(Collection::WorkoutLogs, &log).await?;

    match record_completion(store, &plan.user_id).await? {
        Some(user) => tracing::info!(
            workout_id = %plan.id,
            user_id = %user.id,
            current_streak = user.current_streak,
            total_workouts = user.total_workouts,
            "Workout completed"
        ),
        None => tracing::warn!(
            workout_id = %plan.id,
            user_id = %plan.user_id,
            "Workout completed for a user that does not exist"
        ),
    }

    Ok(Json(CompleteWorkoutResponse {
        message: "Workout completed successfully".to_string(),
        workout: plan,
    }))
}

/// Bump the owner's counters and carry the longest streak along.
///
/// The raise is a separate atomic max, so concurrent completions of one
/// user can reorder it freely without lowering `longestStreak`.
async fn record_completion(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Option<UserProfile>, AppError> {
    let by_id = Filter::by_id(user_id);
    let Some(doc) = store
        .increment(
            Collection::Users,
            &by_id,
            &[(users::fields::TOTAL_WORKOUTS, 1), (users::fields::CURRENT_STREAK, 1)],
        )
        .await?
    else {
        return Ok(None);
    };
    let user: UserProfile = decode(doc)?;
    if user.current_streak <= user.longest_streak {
        return Ok(Some(user));
    }

    let raised = store
        .raise_to_at_least(
            Collection::Users,
            &by_id,
            users::fields::LONGEST_STREAK,
            user.current_streak,
        )
        .await?;
    Ok(Some(match raised {
        Some(doc) => decode(doc)?,
        None => user,
    }))
}

/// DELETE /api/workouts/{workout_id}: remove a plan
///
/// Logs written for the plan are kept.
#[utoipa::path(
    delete,
    path = "/api/workouts/{workout_id}",
    params(("workout_id" = String, Path, description = "Workout plan identifier")),
    responses(
        (status = 200, description = "Workout deleted", body = MessageResponse),
        (status = 404, description = "Workout not found", body = pulsefit_core::error::ApiError)
    ),
    tag = "workouts"
)]
pub async fn delete_workout(
    State(state): State<AppState>,
    Path(workout_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state
        .store
        .delete_one(Collection::Workouts, &Filter::by_id(&workout_id))
        .await?;
    if !deleted {
        return Err(AppError::workout_not_found(&workout_id));
    }

    tracing::info!(workout_id = %workout_id, "Workout plan deleted");
    Ok(Json(MessageResponse {
        message: "Workout deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/workout-logs",
    params(("user_id" = String, Path, description = "Owning user")),
    responses((status = 200, description = "Completion history, newest first", body = Vec<WorkoutLog>)),
    tag = "workouts"
)]
pub async fn list_workout_logs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<WorkoutLog>>, AppError> {
    let logs = state
        .store
        .find_entities(
            Collection::WorkoutLogs,
            &Filter::new().eq(fields::USER_ID, user_id),
            FindOptions::newest_first(fields::COMPLETED_AT).limit(LOG_LIST_LIMIT),
        )
        .await?;
    Ok(Json(logs))
}
