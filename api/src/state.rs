use std::sync::Arc;

use crate::llm::ModelClient;
use crate::store::DocumentStore;

/// Shared handles passed to every handler. Both are opened in `main` and
/// live for the whole process; the store is closed after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub model: Arc<dyn ModelClient>,
}
