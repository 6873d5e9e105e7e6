//! Telemetry utilities for tracing setup and command timing.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; `default_directive` applies otherwise.
/// `json` switches to one JSON object per event.
pub fn init_tracing(default_directive: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one server connection.
    pub fn connection(server: &str, nick: &str) -> Span {
        info_span!("connection", server = %server, nick = %nick)
    }

    /// Span for one dispatched command.
    pub fn command(name: &str, source: &str, target: &str) -> Span {
        info_span!("bot.command", name = %name, source = %source, target = %target)
    }

    /// Span for a cache-through resolution.
    pub fn resolve(relation: &str, key: &str) -> Span {
        info_span!("resolve", relation = %relation, key = %key)
    }
}
