//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BotConfig, LoggingConfig, DatabaseConfig)
//! - [`environment`]: Per-deployment network settings (EnvironmentConfig)
//! - [`sources`]: Remote data source endpoints (SourceConfig)
//! - [`validation`]: Startup validation of a loaded configuration

mod environment;
mod sources;
mod types;
pub mod validation;

pub use environment::EnvironmentConfig;
pub use sources::SourceConfig;
pub use types::{
    BotConfig, Config, ConfigError, DatabaseConfig, LOG_LEVEL_ENV, LoggingConfig, MetricsConfig,
};
