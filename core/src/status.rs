use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A client liveness ping, stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusCheck {
    pub id: String,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusCheckCreate {
    pub client_name: String,
}

impl StatusCheck {
    pub fn new(input: StatusCheckCreate) -> Self {
        Self {
            id: crate::new_id(),
            client_name: input.client_name,
            timestamp: Utc::now(),
        }
    }
}
