//! Fake remote sources and command handlers.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use straybot::cache::{FetchError, Fetched, PersistentStore, RemoteFetch};
use straybot::db::{CacheRecord, DbError};
use straybot::error::{HandlerError, HandlerResult};
use straybot::kernel::{CommandHandler, Context, HelpEntry, Plugin, PluginDescriptor};

/// Serves fixed values by key; unknown keys are `NotFound`.
///
/// Clones share the call counter.
#[derive(Clone)]
pub struct StaticFetcher<V> {
    values: Arc<Mutex<HashMap<String, V>>>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl<V: Clone> StaticFetcher<V> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn with(self, key: &str, value: V) -> Self {
        self.values.lock().insert(key.to_string(), value);
        self
    }

    /// Sleep this long inside every fetch.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> RemoteFetch for StaticFetcher<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self, key: &str) -> Result<Fetched<V>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let value = self.values.lock().get(key).cloned();
        match value {
            Some(value) => Ok(Fetched::new(value).with_source_id(format!("id:{key}"))),
            None => Err(FetchError::NotFound(key.to_string())),
        }
    }
}

/// Always fails with a transient error.
#[derive(Clone)]
pub struct BrokenFetcher<V> {
    calls: Arc<AtomicUsize>,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> BrokenFetcher<V> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            _value: std::marker::PhantomData,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> RemoteFetch for BrokenFetcher<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = V;

    async fn fetch(&self, _key: &str) -> Result<Fetched<V>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Transient("connection reset".into()))
    }
}

/// Which store operation a [`FailingStore`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    Get,
    Put,
}

/// A store that passes through to `inner` except for one failing operation.
pub struct FailingStore {
    pub inner: Arc<dyn PersistentStore>,
    pub fault: StoreFault,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn PersistentStore>, fault: StoreFault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl PersistentStore for FailingStore {
    async fn get(&self, relation: &str, key: &str) -> Result<Option<CacheRecord>, DbError> {
        if self.fault == StoreFault::Get {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        self.inner.get(relation, key).await
    }

    async fn put(
        &self,
        relation: &str,
        key: &str,
        value: &str,
        source_id: Option<&str>,
    ) -> Result<bool, DbError> {
        if self.fault == StoreFault::Put {
            return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
        }
        self.inner.put(relation, key, value, source_id).await
    }
}

/// Replies with fixed text and counts invocations.
pub struct Echo {
    pub text: &'static str,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler for Echo {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.reply(self.text).await?;
        Ok(format!("{} ran {}", ctx.nick(), ctx.invocation.command))
    }
}

/// Always fails.
pub struct Fail;

#[async_trait]
impl CommandHandler for Fail {
    async fn handle(&self, _ctx: &Context<'_>) -> HandlerResult {
        Err(HandlerError::Internal("upstream exploded".into()))
    }
}

/// Always panics.
pub struct Panic;

#[async_trait]
impl CommandHandler for Panic {
    async fn handle(&self, _ctx: &Context<'_>) -> HandlerResult {
        panic!("handler blew up");
    }
}

/// A plugin exporting a fixed command set.
#[derive(Clone, Default)]
pub struct FixedPlugin {
    pub name: &'static str,
    pub commands: Vec<(String, Arc<dyn CommandHandler>)>,
    pub help: Vec<HelpEntry>,
}

impl FixedPlugin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn command(mut self, name: &str, handler: impl CommandHandler + 'static) -> Self {
        self.commands.push((name.to_string(), Arc::new(handler)));
        self
    }

    pub fn help(mut self, entry: HelpEntry) -> Self {
        self.help.push(entry);
        self
    }

    pub fn descriptor(self) -> PluginDescriptor {
        PluginDescriptor::new(self.name, move || -> Box<dyn Plugin> { Box::new(self.clone()) })
    }
}

impl Plugin for FixedPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)> {
        self.commands.clone()
    }

    fn help(&self) -> Vec<HelpEntry> {
        self.help.clone()
    }
}
