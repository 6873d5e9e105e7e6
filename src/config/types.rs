//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::environment::EnvironmentConfig;
use super::sources::SourceConfig;
use crate::logger::LogFilter;

/// Environment variable that overrides the log level filter.
pub const LOG_LEVEL_ENV: &str = "STRAYBOT_LOG_LEVEL";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no environment named {0:?} in config")]
    UnknownEnvironment(String),
    #[error("invalid STRAYBOT_LOG_LEVEL: {0}")]
    LogLevel(#[from] crate::logger::ParseLogFilterError),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Command recognition and privileges.
    #[serde(default)]
    pub bot: BotConfig,
    /// Outcome log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Remote data sources keyed by name (`players`, `player_stats`, `mls`, `nhl`).
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    /// Deployment environments keyed by name.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Look up a deployment environment by name.
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment(name.to_string()))
    }

    /// Resolve the log filter for an environment.
    ///
    /// Precedence: `STRAYBOT_LOG_LEVEL`, then the environment's `log_level`,
    /// then `[logging] level`.
    pub fn log_filter(&self, env: &EnvironmentConfig) -> Result<LogFilter, ConfigError> {
        self.log_filter_with(env, std::env::var(LOG_LEVEL_ENV).ok().as_deref())
    }

    fn log_filter_with(
        &self,
        env: &EnvironmentConfig,
        override_value: Option<&str>,
    ) -> Result<LogFilter, ConfigError> {
        if let Some(value) = override_value {
            return Ok(value.parse()?);
        }
        Ok(env.log_level.unwrap_or(self.logging.level))
    }
}

/// Command recognition and privilege configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Literal prefix that introduces a command (default: ",").
    #[serde(default = "default_command_prefix")]
    pub prefix: String,
    /// Hostmask patterns (`nick!user@host`, `*`/`?` wildcards) of administrators.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_command_prefix(),
            admins: Vec::new(),
        }
    }
}

fn default_command_prefix() -> String {
    ",".to_string()
}

/// Outcome log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Path of the append-only log file.
    #[serde(default = "default_log_path")]
    pub path: String,
    /// Enabled levels: `info`, `error`, `all` or `none`.
    #[serde(default)]
    pub level: LogFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            level: LogFilter::default(),
        }
    }
}

fn default_log_path() -> String {
    "straybot.log".to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file (`:memory:` for a throwaway store).
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "straybot.db".to_string()
}

/// Prometheus metrics endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// HTTP port for `/metrics`. Absent or 0 disables the endpoint.
    pub port: Option<u16>,
}

impl MetricsConfig {
    /// The port to serve on, if enabled.
    pub fn enabled_port(&self) -> Option<u16> {
        self.port.filter(|p| *p != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        [bot]
        prefix = "!"
        admins = ["*!*@staff.example"]

        [logging]
        path = "logs/bot.log"
        level = "info"

        [sources.players]
        url = "https://stats.example/search"
        query_param = "q"
        source_id = "/id"

        [environments.testing]
        server = "localhost:6667"
        nickname = "straybot-dev"
        channels = ["#bots"]
        log_level = "all"

        [environments.production]
        server = "irc.example.net:6667"
        nickname = "straybot"
        channels = ["#hockey"]
    "##;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bot.prefix, ",");
        assert!(config.bot.admins.is_empty());
        assert_eq!(config.logging.path, "straybot.log");
        assert_eq!(config.logging.level, LogFilter::ALL);
        assert_eq!(config.database.path, "straybot.db");
        assert_eq!(config.metrics.enabled_port(), None);
        assert!(config.environments.is_empty());
    }

    #[test]
    fn sample_config_parses() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.admins, vec!["*!*@staff.example"]);
        assert_eq!(config.logging.level, LogFilter::INFO);
        assert_eq!(config.sources["players"].query_param.as_deref(), Some("q"));
        assert_eq!(config.environment("production").unwrap().nickname, "straybot");
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert!(matches!(
            config.environment("staging"),
            Err(ConfigError::UnknownEnvironment(name)) if name == "staging"
        ));
    }

    #[test]
    fn log_filter_precedence() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let testing = config.environment("testing").unwrap();
        let production = config.environment("production").unwrap();

        assert_eq!(config.log_filter_with(testing, None).unwrap(), LogFilter::ALL);
        assert_eq!(config.log_filter_with(production, None).unwrap(), LogFilter::INFO);
        assert_eq!(
            config.log_filter_with(production, Some("error")).unwrap(),
            LogFilter::ERROR
        );
        assert!(config.log_filter_with(production, Some("loud")).is_err());
    }

    #[test]
    fn metrics_port_zero_disables() {
        let config: Config = toml::from_str("[metrics]\nport = 0").unwrap();
        assert_eq!(config.metrics.enabled_port(), None);
        let config: Config = toml::from_str("[metrics]\nport = 9090").unwrap();
        assert_eq!(config.metrics.enabled_port(), Some(9090));
    }
}
