//! straybot - Straylight chat bot
//!
//! A command kernel for IRC: chat lines that start with the command prefix are
//! routed through before triggers, a hot-reloadable handler table and after
//! triggers, and every dispatch ends in one outcome log record. Handlers that
//! need remote data go through a store-first cache backed by SQLite.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod http;
pub mod kernel;
pub mod logger;
pub mod metrics;
pub mod network;
pub mod telemetry;

pub use kernel::{Dispatch, Kernel};
