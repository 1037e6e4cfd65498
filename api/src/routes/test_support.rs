use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::llm::scripted::ScriptedModel;
use crate::state::AppState;
use crate::store::memory::MemoryDocumentStore;

/// Full router over an in-memory store and a scripted model.
pub struct TestApp {
    pub store: Arc<MemoryDocumentStore>,
    pub model: Arc<ScriptedModel>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_model(ScriptedModel::replying("{}"))
    }

    pub fn with_model(model: ScriptedModel) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let model = Arc::new(model);
        let state = AppState {
            store: store.clone(),
            model: model.clone(),
        };
        Self {
            store,
            model,
            router: super::router().with_state(state),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request should succeed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Create a user and return its id.
    pub async fn create_user(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "fitnessLevel": "intermediate"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "user creation failed: {body}");
        body["id"].as_str().expect("user id").to_string()
    }

    /// Create a workout plan for `user_id` and return its id.
    pub async fn create_workout(&self, user_id: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/users/{user_id}/workouts"),
                json!({
                    "name": name,
                    "duration": "30 min",
                    "difficulty": "Beginner",
                    "type": "cardio",
                    "exercises": [
                        {"name": "Jumping Jacks", "sets": 3, "reps": "30"},
                        {"name": "Burpees", "sets": 3, "reps": "10"}
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "workout creation failed: {body}");
        body["id"].as_str().expect("workout id").to_string()
    }
}
