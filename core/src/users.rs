use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Document field names written by aggregate updates.
pub mod fields {
    pub const CURRENT_STREAK: &str = "currentStreak";
    pub const LONGEST_STREAK: &str = "longestStreak";
    pub const TOTAL_WORKOUTS: &str = "totalWorkouts";
}

/// A user's profile and training counters.
///
/// Deserialization fills server-side defaults, so the same type serves as
/// the signup body and as the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default = "crate::new_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub current_streak: i64,
    #[serde(default)]
    pub longest_streak: i64,
    #[serde(default)]
    pub total_workouts: i64,
    #[serde(default = "Utc::now")]
    pub join_date: DateTime<Utc>,
    /// Free-form goal tag (e.g. "strength", "weight loss")
    pub fitness_goal: Option<String>,
    /// Free-form level tag (e.g. "beginner", "advanced")
    pub fitness_level: Option<String>,
}

/// Partial profile update. Absent and null fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub fitness_goal: Option<String>,
    pub fitness_level: Option<String>,
}

impl UserProfileUpdate {
    /// Document fields to merge, keyed by their wire names.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        let pairs = [
            ("name", self.name),
            ("email", self.email),
            ("fitnessGoal", self.fitness_goal),
            ("fitnessLevel", self.fitness_level),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value));
            }
        }
        fields
    }
}
