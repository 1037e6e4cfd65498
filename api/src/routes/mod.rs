use axum::Router;

use crate::state::AppState;

pub mod ai;
pub mod health;
pub mod status;
pub mod users;
pub mod workouts;

#[cfg(test)]
pub(crate) mod test_support;

/// Every API route, without documentation or transport layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(status::router())
        .merge(users::router())
        .merge(workouts::router())
        .merge(ai::router())
}
