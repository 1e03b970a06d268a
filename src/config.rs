//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Prefix of environment variables overriding the file, e.g. `LISTING_SYNC__CHANNEL__BASE_URL`
pub const ENV_PREFIX: &str = "LISTING_SYNC";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listing catalog configuration.
    pub catalog: Catalog,

    /// Chat channel configuration.
    pub channel: Channel,

    /// Local search tool configuration.
    pub search: Search,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

/// Listing catalog configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Catalog {
    /// Path to the JSON array of seed listings.
    #[default("data/listings.json".to_owned())]
    pub seed_path: String,
}

/// Chat channel configuration.
///
/// The channel stays disconnected unless `base_url` is set.
#[derive(Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Channel {
    /// Base URL of the chat platform REST API.
    pub base_url: Option<String>,

    /// Application id on the chat platform.
    pub app_id: String,

    /// REST API key.
    pub api_key: Option<SecretString>,

    /// Uid of the agent the user is chatting with.
    #[default("listing-agent".to_owned())]
    pub agent_uid: String,

    /// Uid messages are sent as.
    #[default("demo-user".to_owned())]
    pub user_uid: String,

    /// Per-request timeout.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,

    /// Attempts after the first failed one.
    #[default(3)]
    pub retries: u32,

    /// Delay before the first retry, doubled after every attempt.
    #[default(time::Duration::from_millis(500))]
    #[serde(with = "humantime_serde")]
    pub backoff: time::Duration,
}

/// Local search tool configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Search {
    /// Maximum number of listings a search returns.
    #[default(20)]
    pub default_limit: usize,
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::new("definitely-not-here.toml").unwrap();
        assert_eq!(config.catalog.seed_path, "data/listings.json");
        assert_eq!(config.channel.timeout, time::Duration::from_secs(10));
        assert_eq!(config.channel.retries, 3);
        assert!(config.channel.base_url.is_none());
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn reads_toml_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[catalog]
seed_path = "fixtures/seed.json"

[channel]
base_url = "https://chat.example.com/v3"
api_key = "k-123"
timeout = "2s 500ms"
retries = 1

[log]
level = "DEBUG"
"#
        )
        .unwrap();

        let config = Config::new(file.path().to_string_lossy()).unwrap();
        assert_eq!(config.catalog.seed_path, "fixtures/seed.json");
        assert_eq!(config.channel.base_url.as_deref(), Some("https://chat.example.com/v3"));
        assert_eq!(config.channel.api_key.as_ref().map(|k| k.expose_secret()), Some("k-123"));
        assert_eq!(config.channel.timeout, time::Duration::from_millis(2500));
        assert_eq!(config.channel.retries, 1);
        assert_eq!(config.channel.agent_uid, "listing-agent");
        assert_eq!(tracing::Level::from(config.log.level), tracing::Level::DEBUG);
    }
}
