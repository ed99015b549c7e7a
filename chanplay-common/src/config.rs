//! Bootstrap configuration
//!
//! Two tiers, like the other services in the workspace:
//! 1. **TOML bootstrap**: database path, port, logging, playout cadence
//! 2. **Resolution**: command line > environment > TOML > compiled defaults
//!
//! A missing or unreadable TOML file never stops startup; a warning is logged
//! and compiled defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "CHANPLAY_DATABASE";
/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "CHANPLAY_PORT";
/// Environment variable naming the TOML bootstrap file
pub const ENV_CONFIG: &str = "CHANPLAY_CONFIG";

const DEFAULT_PORT: u16 = 5760;
const DATABASE_FILE: &str = "chanplay.db";
const CONFIG_FILE: &str = "chanplay.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to the SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playout: PlayoutConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Playout engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PlayoutConfig {
    /// Re-evaluation cadence of the playout ticker
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Window read per resolution; later programs cost one extra query
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: i64,

    /// Event bus buffer size, at least 1
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PlayoutConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            lookahead_hours: default_lookahead_hours(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_lookahead_hours() -> i64 {
    24
}

fn default_event_capacity() -> usize {
    256
}

/// Compiled-in fallbacks for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("chanplay"))
            .unwrap_or_else(|| PathBuf::from("./chanplay_data"));

        Self {
            database_path: data_dir.join(DATABASE_FILE),
            port: DEFAULT_PORT,
            log_level: default_log_level(),
        }
    }
}

/// Default location of the TOML bootstrap file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chanplay").join(CONFIG_FILE))
}

/// Parse a TOML bootstrap file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load the TOML bootstrap file, degrading to defaults
///
/// `explicit` is the path given on the command line or via
/// [`ENV_CONFIG`]; without one the platform default path is tried.
pub fn load_toml_config_or_default(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return TomlConfig::default(),
        },
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Using default configuration: {}", e);
            TomlConfig::default()
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub port: u16,
    pub logging: LoggingConfig,
    pub playout: PlayoutConfig,
}

impl ServiceConfig {
    /// Resolve each setting by priority: CLI > environment > TOML > default
    pub fn resolve(cli_database: Option<PathBuf>, cli_port: Option<u16>, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let database_path = cli_database
            .or_else(|| std::env::var(ENV_DATABASE).ok().map(PathBuf::from))
            .or(toml.database_path)
            .unwrap_or(defaults.database_path);

        let env_port = match std::env::var(ENV_PORT) {
            Ok(raw) => match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!("Ignoring {}={:?}: not a port number", ENV_PORT, raw);
                    None
                }
            },
            Err(_) => None,
        };

        let port = cli_port.or(env_port).or(toml.port).unwrap_or(defaults.port);

        Self {
            database_path,
            port,
            logging: toml.logging,
            playout: toml.playout,
        }
    }
}
