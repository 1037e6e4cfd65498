use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use super::{Collection, DocumentStore, Filter, FindOptions, StoreError, document_id};
use crate::config::DatabaseConfig;

const UNIQUE_VIOLATION: &str = "23505";

/// Document store over a single PostgreSQL `documents` table.
///
/// Every collection lives in the same table, partitioned by the
/// `collection` column. Equality filters become `doc @> filter`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Open the pool and apply the embedded migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::from_str(&config.url)?;
        if let Some(name) = &config.name {
            options = options.database(name);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("../migrations").run(&pool).await?;

        tracing::info!(
            database = config.name.as_deref().unwrap_or("<from url>"),
            max_connections = config.max_connections,
            "Document store ready"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        let id = document_id(&doc)?.to_string();
        sqlx::query("INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(&id)
            .bind(&doc)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                        return StoreError::Duplicate {
                            collection: collection.name(),
                            id: id.clone(),
                        };
                    }
                }
                StoreError::Database(e)
            })?;
        Ok(())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND doc @> $2
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        // A NULL sort key orders every row equally, leaving insertion order.
        // A NULL limit returns every row.
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND doc @> $2
            ORDER BY doc ->> $3::text DESC NULLS LAST, created_at, id
            LIMIT $4
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .bind(options.sort_desc)
        .bind(options.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        // The outer containment check is re-evaluated after a concurrent
        // writer commits, so conditional updates (e.g. `completed: false`)
        // apply at most once.
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents SET doc = doc || $3
            WHERE collection = $1
              AND doc @> $2
              AND id = (
                  SELECT id FROM documents
                  WHERE collection = $1 AND doc @> $2
                  ORDER BY created_at, id
                  LIMIT 1
                  FOR UPDATE
              )
            RETURNING doc
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .bind(Value::Object(fields))
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn increment(
        &self,
        collection: Collection,
        filter: &Filter,
        deltas: &[(&str, i64)],
    ) -> Result<Option<Value>, StoreError> {
        if deltas.is_empty() {
            return self.find_one(collection, filter).await;
        }

        let deltas: Map<String, Value> = deltas
            .iter()
            .map(|(field, delta)| (field.to_string(), Value::from(*delta)))
            .collect();

        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents AS d SET doc = d.doc || (
                SELECT jsonb_object_agg(
                    delta.key,
                    COALESCE((d.doc ->> delta.key)::bigint, 0) + delta.value::bigint
                )
                FROM jsonb_each_text($3) AS delta
            )
            WHERE d.collection = $1
              AND d.doc @> $2
              AND d.id = (
                  SELECT id FROM documents
                  WHERE collection = $1 AND doc @> $2
                  ORDER BY created_at, id
                  LIMIT 1
                  FOR UPDATE
              )
            RETURNING d.doc
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .bind(Value::Object(deltas))
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn raise_to_at_least(
        &self,
        collection: Collection,
        filter: &Filter,
        field: &str,
        value: i64,
    ) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents AS d SET doc = jsonb_set(
                d.doc,
                ARRAY[$3::text],
                to_jsonb(GREATEST(COALESCE((d.doc ->> $3::text)::bigint, 0), $4::bigint))
            )
            WHERE d.collection = $1
              AND d.doc @> $2
              AND d.id = (
                  SELECT id FROM documents
                  WHERE collection = $1 AND doc @> $2
                  ORDER BY created_at, id
                  LIMIT 1
                  FOR UPDATE
              )
            RETURNING d.doc
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1
              AND id = (
                  SELECT id FROM documents
                  WHERE collection = $1 AND doc @> $2
                  ORDER BY created_at, id
                  LIMIT 1
              )
            "#,
        )
        .bind(collection.name())
        .bind(filter.to_json())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND doc @> $2")
            .bind(collection.name())
            .bind(filter.to_json())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
