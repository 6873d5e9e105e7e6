//! JSON-over-HTTP remote source.

use super::{FetchError, Fetched, RemoteFetch};
use crate::config::SourceConfig;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors building a fetcher from configuration.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid source url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Fetches one JSON document per key and deserializes it into `V`.
///
/// HTTP 404, a JSON `null` and an empty array all mean [`FetchError::NotFound`];
/// any other failure is [`FetchError::Transient`].
pub struct HttpJsonFetcher<V> {
    client: reqwest::Client,
    base: Url,
    query_param: Option<String>,
    source_id: Option<String>,
    _value: PhantomData<fn() -> V>,
}

// Manual impl: `V` is only a marker and need not be `Clone`.
impl<V> Clone for HttpJsonFetcher<V> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base: self.base.clone(),
            query_param: self.query_param.clone(),
            source_id: self.source_id.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> HttpJsonFetcher<V> {
    pub fn new(source: &SourceConfig) -> Result<Self, SourceError> {
        let base = Url::parse(&source.url).map_err(|e| SourceError::InvalidUrl {
            url: source.url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(SourceError::InvalidUrl {
                url: source.url.clone(),
                reason: "not a hierarchical URL".into(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(concat!("straybot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base,
            query_param: source.query_param.clone(),
            source_id: source.source_id.clone(),
            _value: PhantomData,
        })
    }

    /// The request URL for `key`.
    pub fn url_for(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        match &self.query_param {
            Some(param) => {
                url.query_pairs_mut().append_pair(param, key);
            }
            None => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(key);
                }
            }
        }
        url
    }
}

#[async_trait]
impl<V> RemoteFetch for HttpJsonFetcher<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self, key: &str) -> Result<Fetched<V>, FetchError> {
        let url = self.url_for(key);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "source request failed");
            FetchError::Transient(format!("request failed: {e}"))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(key.to_string()));
        }

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::Transient(format!("bad status: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(format!("invalid JSON: {e}")))?;

        let empty = match &body {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return Err(FetchError::NotFound(key.to_string()));
        }

        let source_id = self
            .source_id
            .as_deref()
            .and_then(|pointer| body.pointer(pointer))
            .and_then(id_text);

        let value = serde_json::from_value(body)
            .map_err(|e| FetchError::Transient(format!("unexpected response shape: {e}")))?;

        Ok(Fetched { value, source_id })
    }
}

fn id_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
