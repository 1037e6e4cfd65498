pub mod ai;
pub mod error;
pub mod normalize;
pub mod prompts;
pub mod status;
pub mod users;
pub mod workouts;

/// New document identifier (UUIDv7, time-sortable).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
