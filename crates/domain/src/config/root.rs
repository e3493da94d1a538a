use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;
use crate::host_override::{normalize_hostname, HostnameOverride};

/// Main configuration structure for dnsproxy
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (bind address, port, redirect)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream DNS-over-TLS resolver
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// hostname = "IPv4 address or alias target"
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub upstream_address: Option<SocketAddr>,
    pub upstream_tls_name: Option<String>,
    pub upstream_timeout_ms: Option<u64>,
    pub no_redirect: bool,
    pub overrides: Vec<HostnameOverride>,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dnsproxy.toml in current directory
    /// 3. /etc/dnsproxy/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("dnsproxy.toml").exists() {
            Self::from_file("dnsproxy.toml")?
        } else if std::path::Path::new("/etc/dnsproxy/config.toml").exists() {
            Self::from_file("/etc/dnsproxy/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(addr) = overrides.upstream_address {
            self.upstream.address = addr;
        }
        if let Some(name) = overrides.upstream_tls_name {
            self.upstream.tls_name = name;
        }
        if let Some(ms) = overrides.upstream_timeout_ms {
            self.upstream.timeout_ms = ms;
        }
        if overrides.no_redirect {
            self.server.redirect = false;
        }

        // Keys are normalized so a command-line pair replaces a file entry
        // that differs only in case or trailing dot.
        let file_entries = std::mem::take(&mut self.overrides);
        for (hostname, value) in file_entries {
            let key = normalize_hostname(&hostname).unwrap_or(hostname);
            self.overrides.insert(key, value);
        }
        for entry in overrides.overrides {
            self.overrides.insert(entry.hostname, entry.value.to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "upstream timeout must be greater than 0".to_string(),
            ));
        }

        if self.upstream.tls_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "upstream TLS name cannot be empty".to_string(),
            ));
        }

        if self.server.tcp_idle_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "TCP idle timeout must be greater than 0".to_string(),
            ));
        }

        self.host_overrides().map(|_| ())
    }

    /// All configured overrides, parsed.
    pub fn host_overrides(&self) -> Result<Vec<HostnameOverride>, ConfigError> {
        self.overrides
            .iter()
            .map(|(hostname, value)| {
                HostnameOverride::new(hostname, value).map_err(|e| {
                    ConfigError::InvalidOverride(format!("{}={}", hostname, value), e.to_string())
                })
            })
            .collect()
    }
}
