//! The command kernel.
//!
//! Owns everything a dispatch needs: the command pattern, the bot's current
//! nickname, the trigger and handler registries, the outgoing message sink
//! and the outcome logger.
//!
//! - [`invocation`]: command recognition and the per-line record
//! - [`triggers`]: before/after hooks
//! - [`registry`]: the hot-reloadable handler table
//! - [`plugin`]: the plugin interface the table is built from
//! - [`context`]: what handlers receive
//! - [`dispatch`]: the per-line pipeline

pub mod context;
pub mod dispatch;
pub mod invocation;
pub mod plugin;
pub mod registry;
pub mod triggers;

pub use context::{CommandHandler, Context};
pub use dispatch::Dispatch;
pub use invocation::{CommandPattern, Invocation, UserRef};
pub use plugin::{HelpEntry, Plugin, PluginDescriptor};
pub use registry::{HandlerRegistry, HandlerTable, LoadSummary};
pub use triggers::{Phase, Trigger, TriggerRegistry, TriggerResult};

use crate::error::{ReloadError, TransportError};
use crate::logger::Logger;
use crate::network::MessageSink;
use parking_lot::RwLock;
use std::sync::Arc;
use straybot_proto::matches_hostmask;
use tracing::{info, warn};

/// The command kernel. Shared as `Arc<Kernel>` between connection tasks.
pub struct Kernel {
    pattern: CommandPattern,
    nickname: RwLock<String>,
    admins: Vec<String>,
    sink: Arc<dyn MessageSink>,
    logger: Arc<Logger>,
    triggers: TriggerRegistry,
    handlers: HandlerRegistry,
    catalog: Vec<PluginDescriptor>,
}

impl Kernel {
    pub fn builder(sink: Arc<dyn MessageSink>, logger: Arc<Logger>) -> KernelBuilder {
        KernelBuilder {
            prefix: ",".to_string(),
            nickname: String::new(),
            admins: Vec::new(),
            catalog: Vec::new(),
            sink,
            logger,
        }
    }

    /// The nickname the network currently knows the bot by.
    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    /// Record the nickname assigned by the network.
    pub fn on_renamed(&self, nickname: &str) {
        let mut current = self.nickname.write();
        if *current != nickname {
            info!(from = %current, to = %nickname, "Nickname changed");
            *current = nickname.to_string();
        }
    }

    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn catalog(&self) -> &[PluginDescriptor] {
        &self.catalog
    }

    /// Whether `user` matches one of the configured admin hostmasks.
    pub fn is_admin(&self, user: &UserRef) -> bool {
        let mask = user.hostmask();
        self.admins
            .iter()
            .any(|pattern| matches_hostmask(pattern, &mask))
    }

    /// Send `text` to `target` through the message sink.
    pub async fn say(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.sink.send(target, text).await
    }

    /// Rebuild the handler table from the plugin catalog.
    ///
    /// On failure the previous table stays active.
    pub fn reload(&self) -> Result<LoadSummary, ReloadError> {
        match self.handlers.load(&self.catalog, self) {
            Ok(summary) => {
                info!(
                    plugins = summary.plugins,
                    commands = summary.commands,
                    "Handler table published"
                );
                self.logger.info(&format!(
                    "Loaded {} plugins with {} commands",
                    summary.plugins, summary.commands
                ));
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "Reload aborted, previous handler table kept");
                Err(e)
            }
        }
    }
}

/// Builder for [`Kernel`].
pub struct KernelBuilder {
    prefix: String,
    nickname: String,
    admins: Vec<String>,
    catalog: Vec<PluginDescriptor>,
    sink: Arc<dyn MessageSink>,
    logger: Arc<Logger>,
}

impl KernelBuilder {
    /// Command prefix (default `,`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Initial nickname, until the network confirms one.
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    pub fn admins(mut self, admins: impl IntoIterator<Item = String>) -> Self {
        self.admins.extend(admins);
        self
    }

    pub fn plugin(mut self, descriptor: PluginDescriptor) -> Self {
        self.catalog.push(descriptor);
        self
    }

    pub fn plugins(mut self, descriptors: impl IntoIterator<Item = PluginDescriptor>) -> Self {
        self.catalog.extend(descriptors);
        self
    }

    /// Build the kernel. No plugins are loaded until [`Kernel::reload`].
    pub fn build(self) -> Result<Kernel, regex::Error> {
        Ok(Kernel {
            pattern: CommandPattern::new(&self.prefix)?,
            nickname: RwLock::new(self.nickname),
            admins: self.admins,
            sink: self.sink,
            logger: self.logger,
            triggers: TriggerRegistry::new(),
            handlers: HandlerRegistry::new(),
            catalog: self.catalog,
        })
    }
}
