//! Prometheus metrics collection for straybot.
//!
//! Counters and histograms live in a process-wide registry and are exposed on
//! the optional `/metrics` HTTP endpoint.
//!
//! - `bot_command_total{command}` - Commands dispatched to a handler
//! - `bot_command_duration_seconds{command}` - Handler latency histogram
//! - `bot_command_errors_total{command,error}` - Handler failures by kind
//! - `bot_command_denied_total{phase}` - Invocations aborted by a trigger
//! - `bot_cache_lookups_total{relation,result}` - Cache-through outcomes

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Commands dispatched to a handler, by name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler latency by command name.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Handler failures by command name and error code.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Invocations stopped by a Before trigger, or a faulting trigger of either phase.
pub static COMMAND_DENIED: OnceLock<IntCounterVec> = OnceLock::new();

/// Chat lines that named an unregistered command.
pub static UNKNOWN_COMMANDS: OnceLock<IntCounter> = OnceLock::new();

/// Cache-through lookups by relation and result (`hit`, `miss`, `not_found`, `error`).
pub static CACHE_LOOKUPS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls are no-ops for metrics already set.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("bot_command_total", "Commands dispatched by name"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("bot_command_duration_seconds", "Command handler latency by name")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("bot_command_errors_total", "Command handler failures"), &["command", "error"]));
    register!(COMMAND_DENIED, IntCounterVec::new(Opts::new("bot_command_denied_total", "Invocations stopped by triggers"), &["phase"]));
    register!(UNKNOWN_COMMANDS, IntCounter::new("bot_unknown_commands_total", "Lines naming an unregistered command"));
    register!(CACHE_LOOKUPS, IntCounterVec::new(Opts::new("bot_cache_lookups_total", "Cache-through lookups"), &["relation", "result"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record a handler execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a handler failure.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

/// Record an invocation stopped during `phase` (`before` or `after`).
#[inline]
pub fn record_denied(phase: &str) {
    if let Some(c) = COMMAND_DENIED.get() {
        c.with_label_values(&[phase]).inc();
    }
}

#[inline]
pub fn record_unknown_command() {
    if let Some(c) = UNKNOWN_COMMANDS.get() {
        c.inc();
    }
}

/// Record a cache-through lookup outcome.
#[inline]
pub fn record_cache_lookup(relation: &str, result: &str) {
    if let Some(c) = CACHE_LOOKUPS.get() {
        c.with_label_values(&[relation, result]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_command("about", 0.001);
        record_cache_lookup("player_search", "miss");

        let output = gather_metrics();
        assert!(output.contains("bot_command_total"));
        assert!(output.contains("bot_cache_lookups_total"));
    }
}
