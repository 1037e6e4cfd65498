use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use pulsefit_core::status::{StatusCheck, StatusCheckCreate};
use serde::Serialize;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::{Collection, Filter, FindOptions};

/// Most status checks returned by one list call.
const STATUS_LIST_LIMIT: i64 = 1000;

#[derive(Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/", get(root))
        .route("/api/status", get(list_status_checks).post(create_status_check))
}

#[utoipa::path(
    get,
    path = "/api/",
    responses((status = 200, description = "API is reachable", body = RootResponse)),
    tag = "system"
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Hello World".to_string(),
    })
}

/// POST /api/status: record a client ping
#[utoipa::path(
    post,
    path = "/api/status",
    request_body = StatusCheckCreate,
    responses(
        (status = 200, description = "Status check stored", body = StatusCheck),
        (status = 400, description = "Malformed body", body = pulsefit_core::error::ApiError)
    ),
    tag = "system"
)]
pub async fn create_status_check(
    State(state): State<AppState>,
    AppJson(req): AppJson<StatusCheckCreate>,
) -> Result<Json<StatusCheck>, AppError> {
    let check = StatusCheck::new(req);
    state
        .store
        .insert_entity(Collection::StatusChecks, &check)
        .await?;
    Ok(Json(check))
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses((status = 200, description = "Stored status checks", body = Vec<StatusCheck>)),
    tag = "system"
)]
pub async fn list_status_checks(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusCheck>>, AppError> {
    let checks = state
        .store
        .find_entities(
            Collection::StatusChecks,
            &Filter::new(),
            FindOptions::default().limit(STATUS_LIST_LIMIT),
        )
        .await?;
    Ok(Json(checks))
}
