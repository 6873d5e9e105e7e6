//! Unified error handling for straybot.
//!
//! Each layer owns one `thiserror` enum. Every failure is recovered either at
//! the dispatch boundary (handlers, triggers) or at the cache-through boundary
//! (fetch, store); none of them terminate the process.

use thiserror::Error;

pub use crate::cache::{CacheError, FetchError};
pub use crate::db::DbError;
pub use crate::network::TransportError;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors a command handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("send error: {0}")]
    Send(#[from] TransportError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("reload failed: {0}")]
    Reload(#[from] ReloadError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Send(_) => "send_error",
            Self::Cache(e) => e.error_code(),
            Self::Fetch(FetchError::NotFound(_)) => "not_found",
            Self::Fetch(_) => "fetch_error",
            Self::Reload(_) => "reload_error",
            Self::Panicked(_) => "panicked",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for command handlers: the human-readable log outcome.
pub type HandlerResult = Result<String, HandlerError>;

// ============================================================================
// Trigger Errors (before/after hooks)
// ============================================================================

/// A fault raised while evaluating a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("trigger {id} failed: {reason}")]
    Failed { id: String, reason: String },

    #[error("trigger {id} panicked: {reason}")]
    Panicked { id: String, reason: String },
}

// ============================================================================
// Reload Errors (plugin loading)
// ============================================================================

/// Errors that abort a plugin (re)load. The previously published handler
/// table stays active when any of these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReloadError {
    #[error("plugin {plugin} exports invalid command name {name:?}")]
    InvalidCommandName { plugin: String, name: String },

    #[error("plugin {plugin} setup failed: {reason}")]
    Setup { plugin: String, reason: String },
}

/// Boxed error returned by plugin callbacks (trigger checks, plugin setup).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Render a panic payload for logging.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
