use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// The three model-backed operations. They share one pipeline and differ
/// only in prompt and fallback shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTaskKind {
    WorkoutRecommendations,
    FormCheck,
    RestDay,
}

impl AiTaskKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WorkoutRecommendations => "workout_recommendations",
            Self::FormCheck => "form_check",
            Self::RestDay => "rest_day",
        }
    }

    /// Key a client reads first from the result body.
    pub const fn primary_key(&self) -> &'static str {
        match self {
            Self::WorkoutRecommendations => "recommendations",
            Self::FormCheck => "score",
            Self::RestDay => "should_rest",
        }
    }

    /// Value returned when the model output cannot be used.
    pub fn fallback(&self) -> Value {
        let primary = match self {
            Self::WorkoutRecommendations => Value::Array(Vec::new()),
            Self::FormCheck => Value::from(0),
            Self::RestDay => Value::Bool(false),
        };
        let mut fallback = Map::new();
        fallback.insert(self.primary_key().to_string(), primary);
        fallback.insert("error".to_string(), Value::Null);
        fallback.insert("raw_response".to_string(), Value::Null);
        Value::Object(fallback)
    }
}

/// A fully-built prompt ready to send to the model.
#[derive(Debug, Clone)]
pub struct AiTask {
    pub kind: AiTaskKind,
    /// Groups prompts of the same user and task into one conversation
    pub session_id: String,
    pub system_message: &'static str,
    pub prompt: String,
    /// Base64 image attached to the user message (form check only)
    pub image_base64: Option<String>,
}

impl AiTask {
    pub fn fallback(&self) -> Value {
        self.kind.fallback()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkoutRecommendationRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FormCheckRequest {
    pub exercise_name: String,
    /// Base64-encoded photo of the exercise, without a data-URL prefix
    #[serde(default)]
    pub image_base64: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestDayRequest {
    pub user_id: String,
}
