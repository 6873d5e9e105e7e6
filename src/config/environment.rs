//! Per-environment network configuration.
//!
//! A config file carries several named environments (`testing`,
//! `production`, ...); one is selected at startup with `--env`.

use crate::logger::LogFilter;
use serde::Deserialize;

/// Network settings for one deployment environment.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    /// Server address as `host:port`.
    pub server: String,
    /// Requested nickname. The network may assign a different one.
    pub nickname: String,
    /// Username sent in USER.
    #[serde(default = "default_username")]
    pub username: String,
    /// Realname sent in USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Overrides `[logging] level` for this environment.
    pub log_level: Option<LogFilter>,
}

fn default_username() -> String {
    "straybot".to_string()
}

fn default_realname() -> String {
    "Straylight Bot".to_string()
}
