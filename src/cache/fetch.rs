//! Remote fetch contract.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a remote fetch produced no value.
///
/// The two variants are kept apart so callers can tell a bad query from a
/// flaky upstream; neither is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source answered and has no record for the key.
    #[error("no record for {0:?}")]
    NotFound(String),
    /// Network failure, timeout, bad status or unparseable body.
    #[error("{0}")]
    Transient(String),
}

/// A value produced by a remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub value: V,
    /// The source's own identifier for the value, if it exposes one.
    pub source_id: Option<String>,
}

impl<V> Fetched<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

/// A remote source of values keyed by a normalized query string.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    type Value: Serialize + DeserializeOwned + Send + Sync + 'static;

    async fn fetch(&self, key: &str) -> Result<Fetched<Self::Value>, FetchError>;
}
