use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The `[tracker]` section: everything the UDP pipeline and the
/// maintenance loop need.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TrackerConfig {
    pub port: u16,
    pub threads: usize,
    pub is_dynamic: bool,
    pub allow_remotes: bool,
    pub allow_iana_ips: bool,
    pub announce_interval: u32,
    pub cleanup_interval: u64,
    pub peer_timeout: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            port: 6969,
            threads: 5,
            is_dynamic: true,
            allow_remotes: true,
            allow_iana_ips: false,
            announce_interval: 1800,
            cleanup_interval: 120,
            peer_timeout: 7200,
        }
    }
}

/// The `[db]` section. `param` is a SQLite file path, or `:memory:` for a
/// fully volatile tracker.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DbConfig {
    pub param: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            param: "/var/lib/udpt.db".to_string(),
        }
    }
}

/// The `[apiserver]` section: the HTTP admin endpoint.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ApiServerConfig {
    pub enable: bool,
    pub iface: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            enable: false,
            iface: "127.0.0.1".to_string(),
            port: 6969,
        }
    }
}

/// The `[logging]` section.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LoggingConfig {
    pub filename: Option<String>,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filename: Some("/var/log/udpt.log".to_string()),
            level: "warning".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Configuration {
    pub tracker: TrackerConfig,
    pub db: DbConfig,
    pub apiserver: ApiServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    IOError(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
}

impl Configuration {
    /// # Errors
    ///
    /// Will return a `toml::de::Error` for syntactically invalid TOML or
    /// keys of the wrong type.
    pub fn load(data: &str) -> Result<Configuration, toml::de::Error> {
        toml::from_str(data)
    }

    /// # Errors
    ///
    /// Will return a `ConfigError` if the file cannot be read or parsed.
    pub fn load_file(path: &str) -> Result<Configuration, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(Self::load(&data)?)
    }

    pub fn udp_bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.tracker.port)
    }

    pub fn apiserver_bind_address(&self) -> String {
        format!("{}:{}", self.apiserver.iface, self.apiserver.port)
    }
}

/// A configuration for tests: volatile store, ephemeral ports, quiet logs.
pub fn ephemeral_configuration() -> Configuration {
    let mut configuration = Configuration::default();

    configuration.tracker.port = 0;
    configuration.db.param = ":memory:".to_string();
    configuration.apiserver.iface = "127.0.0.1".to_string();
    configuration.apiserver.port = 0;
    configuration.logging.filename = None;
    configuration.logging.level = "off".to_string();

    configuration
}
