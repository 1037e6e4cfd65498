use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{Collection, DocumentStore, Filter, FindOptions, StoreError, document_id};

/// In-process document store for router tests. Each collection keeps its
/// documents in insertion order; a single lock serializes writers, which
/// makes every operation atomic.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn filter_matches(filter: &Filter, doc: &Value) -> bool {
    filter
        .0
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

/// Descending order on one field; documents missing it sort last.
fn compare_desc(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::String(a)), Some(Value::String(b))) => b.cmp(a),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            b.partial_cmp(&a).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        let id = document_id(&doc)?.to_string();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|existing| document_id(existing).ok() == Some(id.as_str())) {
            return Err(StoreError::Duplicate {
                collection: collection.name(),
                id,
            });
        }
        docs.push(doc);
        Ok(())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter_matches(filter, doc)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Value> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter_matches(filter, doc)).cloned().collect())
            .unwrap_or_default();

        if let Some(field) = options.sort_desc {
            docs.sort_by(|a, b| compare_desc(a, b, field));
        }
        if let Some(limit) = options.limit {
            docs.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(docs)
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter_matches(filter, doc)))
        else {
            return Ok(None);
        };

        if let Value::Object(existing) = doc {
            existing.extend(fields);
        }
        Ok(Some(doc.clone()))
    }

    async fn increment(
        &self,
        collection: Collection,
        filter: &Filter,
        deltas: &[(&str, i64)],
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter_matches(filter, doc)))
        else {
            return Ok(None);
        };

        if let Value::Object(existing) = doc {
            for (field, delta) in deltas {
                let current = existing.get(*field).and_then(Value::as_i64).unwrap_or(0);
                existing.insert(field.to_string(), Value::from(current + delta));
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn raise_to_at_least(
        &self,
        collection: Collection,
        filter: &Filter,
        field: &str,
        value: i64,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter_matches(filter, doc)))
        else {
            return Ok(None);
        };

        if let Value::Object(existing) = doc {
            let current = existing.get(field).and_then(Value::as_i64).unwrap_or(0);
            existing.insert(field.to_string(), Value::from(current.max(value)));
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        match docs.iter().position(|doc| filter_matches(filter, doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter_matches(filter, doc));
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_all_pairs() {
        let doc = json!({"id": "w1", "user_id": "u1", "completed": false});

        assert!(filter_matches(&Filter::by_id("w1"), &doc));
        assert!(filter_matches(&Filter::new().eq("user_id", "u1").eq("completed", false), &doc));
        assert!(!filter_matches(&Filter::new().eq("user_id", "u1").eq("completed", true), &doc));
        assert!(!filter_matches(&Filter::new().eq("missing", "x"), &doc));
        assert!(filter_matches(&Filter::new(), &doc));
    }

    #[tokio::test]
    async fn find_many_sorts_newest_first_and_caps() {
        let store = MemoryDocumentStore::new();
        for (id, at) in [("a", "2024-01-01"), ("b", "2024-03-01"), ("c", "2024-02-01")] {
            store
                .insert(Collection::WorkoutLogs, json!({"id": id, "user_id": "u1", "at": at}))
                .await
                .expect("insert should succeed");
        }
        store
            .insert(Collection::WorkoutLogs, json!({"id": "d", "user_id": "u2", "at": "2025"}))
            .await
            .expect("insert should succeed");

        let docs = store
            .find_many(
                Collection::WorkoutLogs,
                &Filter::new().eq("user_id", "u1"),
                FindOptions::newest_first("at").limit(2),
            )
            .await
            .expect("find should succeed");

        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap_or_default()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[tokio::test]
    async fn conditional_update_applies_once() {
        let store = MemoryDocumentStore::new();
        store
            .insert(Collection::Workouts, json!({"id": "w1", "completed": false}))
            .await
            .expect("insert should succeed");

        let guard = Filter::by_id("w1").eq("completed", false);
        let mut fields = Map::new();
        fields.insert("completed".to_string(), json!(true));

        let first = store
            .update_fields(Collection::Workouts, &guard, fields.clone())
            .await
            .expect("update should succeed");
        let second = store
            .update_fields(Collection::Workouts, &guard, fields)
            .await
            .expect("update should succeed");

        assert_eq!(first, Some(json!({"id": "w1", "completed": true})));
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn increment_treats_missing_fields_as_zero() {
        let store = MemoryDocumentStore::new();
        store
            .insert(Collection::Users, json!({"id": "u1", "totalWorkouts": 4}))
            .await
            .expect("insert should succeed");

        let doc = store
            .increment(
                Collection::Users,
                &Filter::by_id("u1"),
                &[("totalWorkouts", 1), ("currentStreak", 1)],
            )
            .await
            .expect("increment should succeed")
            .expect("user should exist");

        assert_eq!(doc["totalWorkouts"], 5);
        assert_eq!(doc["currentStreak"], 1);
    }

    #[tokio::test]
    async fn raise_never_lowers_under_reordered_writers() {
        let store = MemoryDocumentStore::new();
        store
            .insert(
                Collection::Users,
                json!({"id": "u1", "currentStreak": 4, "longestStreak": 4}),
            )
            .await
            .expect("insert should succeed");
        let by_id = Filter::by_id("u1");

        // Two completions increment first, then raise in the opposite order.
        let mut seen = Vec::new();
        for _ in 0..2 {
            let doc = store
                .increment(Collection::Users, &by_id, &[("currentStreak", 1)])
                .await
                .expect("increment should succeed")
                .expect("user should exist");
            seen.push(doc["currentStreak"].as_i64().unwrap_or_default());
        }
        assert_eq!(seen, [5_i64, 6]);
        for streak in seen.into_iter().rev() {
            store
                .raise_to_at_least(Collection::Users, &by_id, "longestStreak", streak)
                .await
                .expect("raise should succeed");
        }

        let doc = store
            .find_one(Collection::Users, &by_id)
            .await
            .expect("find should succeed")
            .expect("user should exist");
        assert_eq!(doc["currentStreak"], 6);
        assert_eq!(doc["longestStreak"], 6);
    }

    #[tokio::test]
    async fn raise_fills_missing_field_and_skips_unknown_documents() {
        let store = MemoryDocumentStore::new();
        store
            .insert(Collection::Users, json!({"id": "u1"}))
            .await
            .expect("insert should succeed");

        let doc = store
            .raise_to_at_least(Collection::Users, &Filter::by_id("u1"), "longestStreak", 3)
            .await
            .expect("raise should succeed")
            .expect("user should exist");
        assert_eq!(doc["longestStreak"], 3);

        let missing = store
            .raise_to_at_least(Collection::Users, &Filter::by_id("u2"), "longestStreak", 3)
            .await
            .expect("raise should succeed");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn insert_rejects_documents_without_id() {
        let store = MemoryDocumentStore::new();
        let err = store
            .insert(Collection::Users, json!({"name": "nobody"}))
            .await
            .expect_err("missing id must be rejected");
        assert!(matches!(err, StoreError::MissingId));
    }
}
