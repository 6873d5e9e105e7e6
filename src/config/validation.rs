//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, EnvironmentConfig};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bot.prefix must not be empty or contain whitespace, got {0:?}")]
    InvalidPrefix(String),
    #[error("bot.admins entry {0:?} must look like nick!user@host")]
    InvalidAdminMask(String),
    #[error("environment server must be host:port, got {0:?}")]
    InvalidServer(String),
    #[error("environment nickname is required")]
    MissingNickname,
    #[error("channel names must start with # or &, got {0:?}")]
    InvalidChannel(String),
    #[error("sources.{0}.url is not an absolute http(s) URL")]
    InvalidSourceUrl(String),
    #[error("sources.{0}.source_id must be a JSON pointer starting with '/'")]
    InvalidSourcePointer(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration and the selected environment, returning all errors found.
pub fn validate(config: &Config, env: &EnvironmentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let prefix = &config.bot.prefix;
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidPrefix(prefix.clone()));
    }

    for mask in &config.bot.admins {
        if !(mask.contains('!') && mask.contains('@')) {
            errors.push(ValidationError::InvalidAdminMask(mask.clone()));
        }
    }

    match env.server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
        _ => errors.push(ValidationError::InvalidServer(env.server.clone())),
    }

    if env.nickname.trim().is_empty() {
        errors.push(ValidationError::MissingNickname);
    }

    for channel in &env.channels {
        if !(channel.starts_with('#') || channel.starts_with('&')) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    let mut names: Vec<_> = config.sources.keys().collect();
    names.sort();
    for name in names {
        let source = &config.sources[name];
        match reqwest::Url::parse(&source.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::InvalidSourceUrl(name.clone())),
        }
        if let Some(pointer) = &source.source_id
            && !pointer.starts_with('/')
        {
            errors.push(ValidationError::InvalidSourcePointer(name.clone()));
        }
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
