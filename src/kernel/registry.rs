//! Command handler registry and hot reload.
//!
//! The published [`HandlerTable`] is immutable. A load builds a new table off
//! to the side and swaps it in whole, so a dispatch always sees either the
//! old table or the new one.

use super::Kernel;
use super::context::CommandHandler;
use super::invocation::is_valid_command_name;
use super::plugin::{HelpEntry, Plugin, PluginDescriptor};
use crate::error::{ReloadError, panic_message};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::warn;

/// One generation of loaded commands.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    help: BTreeMap<String, HelpEntry>,
    plugins: Vec<String>,
}

impl HandlerTable {
    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(command).cloned()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Help for `command`, if any was exported.
    pub fn help_for(&self, command: &str) -> Option<&HelpEntry> {
        self.help.get(command)
    }

    /// All help entries, sorted by command.
    pub fn help(&self) -> impl Iterator<Item = &HelpEntry> {
        self.help.values()
    }

    /// Names of the plugins in load order.
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }
}

/// Counts from a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub plugins: usize,
    pub commands: usize,
    pub help_entries: usize,
}

/// The active handler table.
#[derive(Default)]
pub struct HandlerRegistry {
    table: RwLock<Arc<HandlerTable>>,
    loading: Mutex<()>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published table.
    pub fn snapshot(&self) -> Arc<HandlerTable> {
        Arc::clone(&self.table.read())
    }

    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.table.read().get(command)
    }

    /// Build a table from fresh instances of `catalog` and publish it.
    ///
    /// An invalid command name or a failing setup aborts the load and leaves
    /// the previous table active. Triggers registered by setups that already
    /// ran stay registered; they are keyed by id, so the next load replaces them.
    pub fn load(
        &self,
        catalog: &[PluginDescriptor],
        kernel: &Kernel,
    ) -> Result<LoadSummary, ReloadError> {
        let _loading = self.loading.lock();

        let plugins: Vec<Box<dyn Plugin>> = catalog.iter().map(|d| d.instantiate()).collect();

        let mut table = HandlerTable::default();
        for plugin in &plugins {
            for (name, handler) in plugin.commands() {
                if !is_valid_command_name(&name) {
                    return Err(ReloadError::InvalidCommandName {
                        plugin: plugin.name().to_string(),
                        name,
                    });
                }
                if table.handlers.insert(name.clone(), handler).is_some() {
                    warn!(command = %name, plugin = %plugin.name(), "Command overridden by a later plugin");
                }
            }
            for entry in plugin.help() {
                table.help.insert(entry.command().to_string(), entry);
            }
            table.plugins.push(plugin.name().to_string());
        }

        for plugin in &plugins {
            let outcome = catch_unwind(AssertUnwindSafe(|| plugin.setup(kernel)));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            return Err(ReloadError::Setup {
                plugin: plugin.name().to_string(),
                reason,
            });
        }

        let summary = LoadSummary {
            plugins: table.plugins.len(),
            commands: table.handlers.len(),
            help_entries: table.help.len(),
        };
        *self.table.write() = Arc::new(table);
        Ok(summary)
    }
}
