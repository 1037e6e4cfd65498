//! Persistence gateway: JSON documents in named collections.
//!
//! Documents are keyed by their own string `id` field, never by a
//! store-native key. Filters are plain field equality. No operation spans
//! more than one collection and there are no multi-document transactions.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    StatusChecks,
    Users,
    Workouts,
    WorkoutLogs,
}

impl Collection {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StatusChecks => "status_checks",
            Self::Users => "users",
            Self::Workouts => "workouts",
            Self::WorkoutLogs => "workout_logs",
        }
    }
}

/// Conjunction of field equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Filter as a JSON object, suitable for `jsonb` containment.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Field to sort by, descending. Insertion order when unset.
    pub sort_desc: Option<&'static str>,
    /// Maximum number of documents returned.
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn newest_first(field: &'static str) -> Self {
        Self {
            sort_desc: Some(field),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document has no string `id` field")]
    MissingId,
    #[error("document {id} already exists in {collection}")]
    Duplicate { collection: &'static str, id: String },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new document. The document must carry a string `id`.
    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError>;

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Value>, StoreError>;

    /// Merge `fields` into the first matching document and return the result.
    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Atomically add integer deltas to fields of the first matching
    /// document. Missing fields count as zero.
    async fn increment(
        &self,
        collection: Collection,
        filter: &Filter,
        deltas: &[(&str, i64)],
    ) -> Result<Option<Value>, StoreError>;

    /// Atomically set an integer field of the first matching document to
    /// `max(current, value)`. A missing field counts as zero. Never lowers
    /// the stored value, whatever order concurrent callers land in.
    async fn raise_to_at_least(
        &self,
        collection: Collection,
        filter: &Filter,
        field: &str,
        value: i64,
    ) -> Result<Option<Value>, StoreError>;

    async fn delete_one(&self, collection: Collection, filter: &Filter)
    -> Result<bool, StoreError>;

    async fn delete_many(&self, collection: Collection, filter: &Filter)
    -> Result<u64, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release connections. Called once at shutdown.
    async fn close(&self);
}

/// Typed wrappers over the raw document operations.
impl<'s> dyn DocumentStore + 's {
    pub async fn insert_entity<T: Serialize + Sync>(
        &self,
        collection: Collection,
        entity: &T,
    ) -> Result<(), StoreError> {
        let doc = serde_json::to_value(entity)?;
        self.insert(collection, doc).await
    }

    pub async fn find_entity<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<T>, StoreError> {
        self.find_one(collection, filter)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_entities<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        self.find_many(collection, filter, options)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

pub fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}

pub(crate) fn document_id(doc: &Value) -> Result<&str, StoreError> {
    doc.get("id")
        .and_then(Value::as_str)
        .ok_or(StoreError::MissingId)
}
