//! Plugin interface.
//!
//! A plugin bundles related commands and their help text. The kernel keeps a
//! catalog of [`PluginDescriptor`]s and asks each factory for a fresh plugin
//! on every (re)load.

use super::Kernel;
use super::context::CommandHandler;
use crate::error::BoxError;
use std::fmt;
use std::sync::Arc;

/// Help keys starting with this marker are listed to admins only.
pub const ADMIN_HELP_MARKER: char = '~';

/// One help line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    /// Command name, with [`ADMIN_HELP_MARKER`] in front when admin-only.
    pub key: String,
    pub text: String,
}

impl HelpEntry {
    pub fn new(command: &str, text: impl Into<String>) -> Self {
        Self {
            key: command.to_string(),
            text: text.into(),
        }
    }

    pub fn admin(command: &str, text: impl Into<String>) -> Self {
        Self {
            key: format!("{ADMIN_HELP_MARKER}{command}"),
            text: text.into(),
        }
    }

    pub fn is_admin_only(&self) -> bool {
        self.key.starts_with(ADMIN_HELP_MARKER)
    }

    /// The command this entry documents.
    pub fn command(&self) -> &str {
        self.key.trim_start_matches(ADMIN_HELP_MARKER)
    }
}

/// A group of commands loaded together.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Commands exported by this plugin.
    fn commands(&self) -> Vec<(String, Arc<dyn CommandHandler>)>;

    fn help(&self) -> Vec<HelpEntry> {
        Vec::new()
    }

    /// Called once per load, after every command name validated.
    fn setup(&self, _kernel: &Kernel) -> Result<(), BoxError> {
        Ok(())
    }
}

type PluginFactory = dyn Fn() -> Box<dyn Plugin> + Send + Sync;

/// How to build a plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    factory: Arc<PluginFactory>,
}

impl PluginDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a fresh instance.
    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.factory)()
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
