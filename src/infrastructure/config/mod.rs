//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::throttle::DEFAULT_MIN_INTERVAL;
use crate::application::services::membership::DEFAULT_REFRESH_TIMEOUT;

/// Modules loaded when the configuration does not say otherwise
pub const DEFAULT_MODULES: [&str; 6] = ["memo", "webinfo", "search", "xkcd", "pictures", "quote"];

/// Bot configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub irc: IrcConfig,
    pub throttle: ThrottleConfig,
    pub membership: MembershipConfig,
    pub modules: ModulesConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IrcConfig {
    /// IRC_SERVER[:PORT]
    pub server: String,
    pub nick: String,
    pub channel: String,
    pub key: Option<String>,
    pub tls: bool,
    pub tls_insecure: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ThrottleConfig {
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MembershipConfig {
    pub refresh_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ModulesConfig {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    pub debug: bool,
    /// Log file; stdout when unset
    pub file: Option<PathBuf>,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "chat.freenode.net:6697".to_string(),
            nick: "goxxx".to_string(),
            channel: String::new(),
            key: None,
            tls: true,
            tls_insecure: false,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./storage/db.sqlite"),
        }
    }
}

impl ThrottleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl MembershipConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from `path` when it exists, defaults otherwise; then apply
    /// environment overrides.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(channel) = std::env::var("GOXXX_CHANNEL") {
            self.irc.channel = channel;
        }
        if let Ok(nick) = std::env::var("GOXXX_NICK") {
            self.irc.nick = nick;
        }
        if let Ok(server) = std::env::var("GOXXX_SERVER") {
            self.irc.server = server;
        }
    }

    /// Enabled modules, trimmed and lowercased, `help` excluded
    pub fn enabled_modules(&self) -> Vec<String> {
        self.modules
            .enabled
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty() && m != "help")
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.irc.channel.trim().is_empty() {
            return Err(ConfigError::MissingField("irc.channel".to_string()));
        }
        if self.irc.nick.trim().is_empty() {
            return Err(ConfigError::MissingField("irc.nick".to_string()));
        }
        if self.irc.server.trim().is_empty() {
            return Err(ConfigError::MissingField("irc.server".to_string()));
        }
        if self.throttle.min_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "throttle.min-interval-ms must be greater than 0".to_string(),
            ));
        }
        if self.membership.refresh_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "membership.refresh-timeout-secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
