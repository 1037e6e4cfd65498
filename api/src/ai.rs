use pulsefit_core::ai::AiTask;
use pulsefit_core::normalize::{self, PARSE_FAILURE};
use serde_json::Value;

use crate::llm::ModelClient;

/// Send a prompt and normalize the completion.
///
/// Always yields a body for a 200 response: model failures and unparseable
/// completions come back as the task's fallback value with `error` set.
pub async fn run(model: &dyn ModelClient, task: AiTask) -> Value {
    let fallback = task.fallback();

    match model.send(&task).await {
        Ok(raw) => {
            let result = normalize::normalize(&raw, &fallback);
            if result.get("error").and_then(Value::as_str) == Some(PARSE_FAILURE) {
                tracing::warn!(
                    task = task.kind.as_str(),
                    session_id = %task.session_id,
                    completion_len = raw.len(),
                    "Model completion held no parseable JSON object"
                );
            }
            result
        }
        Err(err) => {
            tracing::error!(
                task = task.kind.as_str(),
                session_id = %task.session_id,
                error = %err,
                "Model call failed"
            );
            normalize::upstream_failure(&fallback, &err.to_string())
        }
    }
}
