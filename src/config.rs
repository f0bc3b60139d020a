//! Server configuration.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values, which take
//! precedence over the built-in defaults.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 6380
//!
//! [protocol]
//! max_line_length = 65536
//! max_bulk_length = 536870912
//! max_array_length = 1048576
//! max_depth = 32
//!
//! [logging]
//! level = "debug"
//! ```

use crate::protocol::ParserLimits;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments for the server
#[derive(Parser, Debug, Default)]
#[command(name = "flashresp")]
#[command(version)]
#[command(about = "A Redis-protocol compatible server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (default: 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: 6379)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Longest accepted protocol line in bytes
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Largest accepted bulk string in bytes
    #[arg(long)]
    pub max_bulk_length: Option<usize>,

    /// Largest accepted array element count
    #[arg(long)]
    pub max_array_length: Option<usize>,

    /// Deepest accepted array nesting
    #[arg(long)]
    pub max_depth: Option<usize>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Parser limits
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    pub max_line_length: Option<usize>,
    pub max_bulk_length: Option<usize>,
    pub max_array_length: Option<usize>,
    pub max_depth: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// Final resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub limits: ParserLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            limits: ParserLimits::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process arguments and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolve configuration from already-parsed arguments.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = match cli.config {
            Some(ref config_path) => {
                let contents = std::fs::read_to_string(config_path)
                    .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
                toml::from_str(&contents)
                    .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
            }
            None => TomlConfig::default(),
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args over the TOML config over the defaults.
    pub fn merge(cli: CliArgs, file: TomlConfig) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let limits = ParserLimits {
            max_line_length: cli
                .max_line_length
                .or(file.protocol.max_line_length)
                .unwrap_or(defaults.limits.max_line_length),
            max_bulk_length: cli
                .max_bulk_length
                .or(file.protocol.max_bulk_length)
                .unwrap_or(defaults.limits.max_bulk_length),
            max_array_length: cli
                .max_array_length
                .or(file.protocol.max_array_length)
                .unwrap_or(defaults.limits.max_array_length),
            max_depth: cli
                .max_depth
                .or(file.protocol.max_depth)
                .unwrap_or(defaults.limits.max_depth),
        };

        let config = Config {
            host: cli.host.or(file.server.host).unwrap_or(defaults.host),
            port: cli.port.or(file.server.port).unwrap_or(defaults.port),
            log_level: cli
                .log_level
                .or(file.logging.level)
                .unwrap_or(defaults.log_level),
            limits,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_line_length", self.limits.max_line_length),
            ("max_bulk_length", self.limits.max_bulk_length),
            ("max_array_length", self.limits.max_array_length),
            ("max_depth", self.limits.max_depth),
        ];
        match limits.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::InvalidLimit(*name)),
            None => Ok(()),
        }
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {1}", path = .0.display())]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{path}': {1}", path = .0.display())]
    TomlParse(PathBuf, #[source] toml::de::Error),

    #[error("{0} must be greater than zero")]
    InvalidLimit(&'static str),
}
