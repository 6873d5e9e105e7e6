//! Cache record repository.
//!
//! Rows are write-once: inserting an existing `(relation, key)` is ignored,
//! so concurrent writers for the same key cannot clobber each other.

use super::{Database, DbError};
use crate::cache::PersistentStore;
use async_trait::async_trait;
use sqlx::SqlitePool;

/// A persisted cache-through record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CacheRecord {
    pub relation: String,
    pub key: String,
    /// Serialized JSON value.
    pub value: String,
    /// Identifier of the record at the remote source, when known.
    pub source_id: Option<String>,
    /// Unix timestamp of the insert.
    pub created_at: i64,
}

/// Repository for cache record operations.
pub struct RecordRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RecordRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the record for `(relation, key)`.
    pub async fn get(&self, relation: &str, key: &str) -> Result<Option<CacheRecord>, DbError> {
        let record = sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT relation, key, value, source_id, created_at
            FROM cache_records
            WHERE relation = ? AND key = ?
            "#,
        )
        .bind(relation)
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Insert a record unless one already exists. Returns `true` if this call inserted it.
    pub async fn insert(
        &self,
        relation: &str,
        key: &str,
        value: &str,
        source_id: Option<&str>,
    ) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO cache_records (relation, key, value, source_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (relation, key) DO NOTHING
            "#,
        )
        .bind(relation)
        .bind(key)
        .bind(value)
        .bind(source_id)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Number of records stored for a relation.
    pub async fn count(&self, relation: &str) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cache_records WHERE relation = ?")
                .bind(relation)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl PersistentStore for Database {
    async fn get(&self, relation: &str, key: &str) -> Result<Option<CacheRecord>, DbError> {
        self.records().get(relation, key).await
    }

    async fn put(
        &self,
        relation: &str,
        key: &str,
        value: &str,
        source_id: Option<&str>,
    ) -> Result<bool, DbError> {
        self.records().insert(relation, key, value, source_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_is_write_once() {
        let db = Database::new(":memory:").await.unwrap();
        let records = db.records();

        assert!(records.insert("player_search", "crosby", "[1]", Some("8471675")).await.unwrap());
        assert!(!records.insert("player_search", "crosby", "[2]", None).await.unwrap());

        let stored = records.get("player_search", "crosby").await.unwrap().unwrap();
        assert_eq!(stored.value, "[1]");
        assert_eq!(stored.source_id.as_deref(), Some("8471675"));
        assert!(stored.created_at > 0);
        assert_eq!(records.count("player_search").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn relations_are_separate_namespaces() {
        let db = Database::new(":memory:").await.unwrap();
        let records = db.records();

        records.insert("player_search", "ovechkin", "\"a\"", None).await.unwrap();
        records.insert("player_stats", "ovechkin", "\"b\"", None).await.unwrap();

        assert_eq!(
            records.get("player_stats", "ovechkin").await.unwrap().unwrap().value,
            "\"b\""
        );
        assert!(records.get("mls", "ovechkin").await.unwrap().is_none());
    }
}
