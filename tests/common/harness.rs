//! Kernel harness.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use straybot::Dispatch;
use straybot::kernel::{Kernel, PluginDescriptor, UserRef};
use straybot::logger::{LogFilter, Logger, MemorySink};
use straybot::network::{MessageSink, TransportError};

/// Host every admin test user connects from.
pub const ADMIN_HOST: &str = "staff.example";

/// Nickname the harness kernel starts with.
pub const BOT_NICK: &str = "straybot";

/// Remembers every `(target, text)` the kernel sends.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// Texts sent to `target`, in order.
    pub fn to(&self, target: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(t, _)| t == target)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.sent.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.sent.lock().push((target.to_string(), text.to_string()));
        Ok(())
    }
}

/// A regular user.
pub fn user(nick: &str) -> UserRef {
    UserRef::new(nick, nick, "users.example")
}

/// A user matching the harness admin mask.
pub fn admin(nick: &str) -> UserRef {
    UserRef::new(nick, nick, ADMIN_HOST)
}

/// A kernel wired to a recording sink and an in-memory outcome log.
pub struct Harness {
    pub kernel: Arc<Kernel>,
    pub sink: Arc<RecordingSink>,
    pub log: MemorySink,
}

impl Harness {
    /// Build and load a kernel with `plugins`.
    pub fn new(plugins: Vec<PluginDescriptor>) -> Self {
        let harness = Self::unloaded(plugins);
        harness.kernel.reload().expect("initial load");
        harness
    }

    /// Build a kernel without loading any plugin.
    pub fn unloaded(plugins: Vec<PluginDescriptor>) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let log = MemorySink::new();
        let logger = Logger::with_sinks(
            Box::new(log.clone()),
            Box::new(std::io::sink()),
            LogFilter::ALL,
        );
        let kernel = Kernel::builder(sink.clone(), Arc::new(logger))
            .nickname(BOT_NICK)
            .admins([format!("*!*@{ADMIN_HOST}")])
            .plugins(plugins)
            .build()
            .expect("default prefix compiles");
        Self {
            kernel: Arc::new(kernel),
            sink,
            log,
        }
    }

    /// Dispatch `line` from `from`, said in `to`.
    pub async fn say(&self, from: &UserRef, to: &str, line: &str) -> Dispatch {
        self.kernel.handle(line, from.clone(), to).await
    }

    /// Every outcome log record.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.lines()
    }

    /// Info records whose message contains `needle`.
    pub fn info_containing(&self, needle: &str) -> Vec<String> {
        self.log_lines()
            .into_iter()
            .filter(|line| line.contains("(LOG) ") && line.contains(needle))
            .collect()
    }

    /// Error records whose message contains `needle`.
    pub fn errors_containing(&self, needle: &str) -> Vec<String> {
        self.log_lines()
            .into_iter()
            .filter(|line| line.contains("(ERROR) ") && line.contains(needle))
            .collect()
    }

    /// Error records.
    pub fn errors(&self) -> Vec<String> {
        self.errors_containing("")
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
