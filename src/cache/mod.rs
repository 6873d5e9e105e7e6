//! Cache-through lookups over a persistent store.
//!
//! A [`CacheThrough`] is bound to one relation (`player_search`,
//! `player_stats`, ...). Resolving a key consults the store first and only
//! calls the remote source on a miss. Successful fetches are written back
//! once; failures are never written, so a later lookup retries the source.
//!
//! Concurrent resolutions of the same new key are single-flighted: the first
//! caller fetches, the others wait on a per-key lock and then find the
//! record in the store.

mod fetch;
mod http;

pub use fetch::{FetchError, Fetched, RemoteFetch};
pub use http::{HttpJsonFetcher, SourceError};

use crate::db::{CacheRecord, DbError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{Instrument, debug};

/// Write-once record storage keyed by `(relation, key)`.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, relation: &str, key: &str) -> Result<Option<CacheRecord>, DbError>;

    /// Insert unless present. Returns `true` when this call wrote the record.
    async fn put(
        &self,
        relation: &str,
        key: &str,
        value: &str,
        source_id: Option<&str>,
    ) -> Result<bool, DbError>;
}

/// Errors from a cache-through resolution.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("stored value could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    /// Whether the remote source reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fetch(FetchError::NotFound(_)))
    }

    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::NotFound(_)) => "not_found",
            Self::Fetch(FetchError::Transient(_)) => "fetch_error",
            Self::Store(_) => "store_error",
            Self::Codec(_) => "codec_error",
        }
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Store,
    Remote,
}

/// A successfully resolved value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<V> {
    pub value: V,
    pub source_id: Option<String>,
    pub origin: Origin,
}

/// Normalize a lookup key: surrounding whitespace dropped, lowercased.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Store-first lookup for one relation.
pub struct CacheThrough<F: RemoteFetch> {
    relation: String,
    store: Arc<dyn PersistentStore>,
    fetcher: F,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl<F: RemoteFetch> CacheThrough<F> {
    pub fn new(relation: impl Into<String>, store: Arc<dyn PersistentStore>, fetcher: F) -> Self {
        Self {
            relation: relation.into(),
            store,
            fetcher,
            inflight: DashMap::new(),
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve `key`, fetching and persisting it on a store miss.
    pub async fn resolve(&self, key: &str) -> Result<Resolved<F::Value>, CacheError> {
        let key = normalize_key(key);
        let span = crate::telemetry::spans::resolve(&self.relation, &key);
        let result = self.resolve_normalized(&key).instrument(span).await;
        let label = match &result {
            Ok(Resolved {
                origin: Origin::Store,
                ..
            }) => "hit",
            Ok(_) => "miss",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        };
        crate::metrics::record_cache_lookup(&self.relation, label);
        result
    }

    async fn resolve_normalized(&self, key: &str) -> Result<Resolved<F::Value>, CacheError> {
        if let Some(hit) = self.lookup(key).await? {
            debug!("cache hit");
            return Ok(hit);
        }

        let lock = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.fill(key).await
        };

        // The map and `lock` are the only holders once nobody else is waiting.
        self.inflight
            .remove_if(key, |_, entry| Arc::strong_count(entry) <= 2);

        result
    }

    /// Re-check the store under the key lock, then fetch and persist.
    async fn fill(&self, key: &str) -> Result<Resolved<F::Value>, CacheError> {
        if let Some(hit) = self.lookup(key).await? {
            debug!("filled by a concurrent resolution");
            return Ok(hit);
        }

        debug!("cache miss, fetching");
        let fetched = self.fetcher.fetch(key).await?;
        let encoded = serde_json::to_string(&fetched.value)?;
        let inserted = self
            .store
            .put(&self.relation, key, &encoded, fetched.source_id.as_deref())
            .await?;
        if !inserted {
            // Another writer got there first; its record is the one every
            // later lookup returns.
            debug!("record already present, returning stored value");
            if let Some(stored) = self.lookup(key).await? {
                return Ok(stored);
            }
        }

        Ok(Resolved {
            value: fetched.value,
            source_id: fetched.source_id,
            origin: Origin::Remote,
        })
    }

    async fn lookup(&self, key: &str) -> Result<Option<Resolved<F::Value>>, CacheError> {
        let Some(record) = self.store.get(&self.relation, key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&record.value)?;
        Ok(Some(Resolved {
            value,
            source_id: record.source_id,
            origin: Origin::Store,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteFetch for Echo {
        type Value = String;

        async fn fetch(&self, key: &str) -> Result<Fetched<String>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match key {
                "missing" => Err(FetchError::NotFound(key.into())),
                "flaky" => Err(FetchError::Transient("timed out".into())),
                _ => Ok(Fetched::new(key.to_uppercase()).with_source_id("id-1")),
            }
        }
    }

    async fn cache() -> CacheThrough<Echo> {
        let db = Database::new(":memory:").await.unwrap();
        CacheThrough::new(
            "echo",
            Arc::new(db),
            Echo {
                calls: AtomicUsize::new(0),
            },
        )
    }

    #[test]
    fn keys_are_trimmed_and_lowercased() {
        assert_eq!(normalize_key("  Sidney Crosby "), "sidney crosby");
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_store() {
        let cache = cache().await;

        let first = cache.resolve("Crosby").await.unwrap();
        assert_eq!(first.origin, Origin::Remote);
        assert_eq!(first.value, "CROSBY");
        assert_eq!(first.source_id.as_deref(), Some("id-1"));

        let second = cache.resolve(" crosby").await.unwrap();
        assert_eq!(second.origin, Origin::Store);
        assert_eq!(second.value, "CROSBY");
        assert_eq!(second.source_id.as_deref(), Some("id-1"));
        assert_eq!(cache.fetcher().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_distinct_and_not_persisted() {
        let cache = cache().await;

        let err = cache.resolve("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "not_found");

        let err = cache.resolve("flaky").await.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.error_code(), "fetch_error");

        assert!(cache.resolve("missing").await.is_err());
        assert_eq!(cache.fetcher().calls.load(Ordering::SeqCst), 3);
        assert!(cache.inflight.is_empty());
    }

    /// Lets a competing writer land between the re-check and the write.
    struct Preempted {
        inner: Database,
    }

    #[async_trait]
    impl PersistentStore for Preempted {
        async fn get(&self, relation: &str, key: &str) -> Result<Option<CacheRecord>, DbError> {
            self.inner.get(relation, key).await
        }

        async fn put(
            &self,
            relation: &str,
            key: &str,
            value: &str,
            source_id: Option<&str>,
        ) -> Result<bool, DbError> {
            self.inner
                .put(relation, key, "\"FROM ELSEWHERE\"", Some("id-0"))
                .await?;
            self.inner.put(relation, key, value, source_id).await
        }
    }

    #[tokio::test]
    async fn lost_write_returns_the_stored_record() {
        let db = Database::new(":memory:").await.unwrap();
        let cache = CacheThrough::new(
            "echo",
            Arc::new(Preempted { inner: db.clone() }),
            Echo {
                calls: AtomicUsize::new(0),
            },
        );

        let first = cache.resolve("crosby").await.unwrap();
        assert_eq!(first.value, "FROM ELSEWHERE");
        assert_eq!(first.source_id.as_deref(), Some("id-0"));
        assert_eq!(first.origin, Origin::Store);

        let again = CacheThrough::new(
            "echo",
            Arc::new(db),
            Echo {
                calls: AtomicUsize::new(0),
            },
        );
        assert_eq!(again.resolve("crosby").await.unwrap(), first);
    }
}
