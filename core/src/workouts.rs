use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document field names used in workout and log queries.
pub mod fields {
    pub const USER_ID: &str = "user_id";
    pub const COMPLETED: &str = "completed";
    pub const COMPLETED_AT: &str = "completedAt";
}

/// One exercise inside a plan. `reps` is free text ("12", "8-10", "30s").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Exercise {
    pub name: String,
    pub sets: i32,
    pub reps: String,
}

/// A workout plan owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkoutPlan {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Duration label, e.g. "45 min"
    pub duration: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub workout_type: String,
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "scheduledFor")]
    pub scheduled_for: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWorkoutPlan {
    pub name: String,
    pub duration: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub workout_type: String,
    pub exercises: Vec<Exercise>,
    #[serde(rename = "scheduledFor", default)]
    pub scheduled_for: Option<String>,
}

impl WorkoutPlan {
    pub fn new(user_id: impl Into<String>, input: CreateWorkoutPlan) -> Self {
        Self {
            id: crate::new_id(),
            user_id: user_id.into(),
            name: input.name,
            duration: input.duration,
            difficulty: input.difficulty,
            workout_type: input.workout_type,
            exercises: input.exercises,
            completed: false,
            scheduled_for: input.scheduled_for,
            created_at: Utc::now(),
        }
    }
}

/// Record of one completed workout. Name and duration are copied from the
/// plan so the log survives plan deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkoutLog {
    pub id: String,
    pub user_id: String,
    pub workout_id: String,
    pub workout_name: String,
    pub duration: String,
    /// Always six fractional digits, so the stored text sorts in time order
    #[serde(rename = "completedAt", serialize_with = "fixed_micros")]
    pub completed_at: DateTime<Utc>,
}

fn fixed_micros<S: serde::Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
}

impl WorkoutLog {
    pub fn for_completion(plan: &WorkoutPlan) -> Self {
        Self {
            id: crate::new_id(),
            user_id: plan.user_id.clone(),
            workout_id: plan.id.clone(),
            workout_name: plan.name.clone(),
            duration: plan.duration.clone(),
            completed_at: Utc::now().trunc_subsecs(6),
        }
    }
}
