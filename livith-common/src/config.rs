//! Configuration loading
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing default config file is not an error; the service starts with
//! defaults. A config file named explicitly must exist and parse.

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable for the data directory
pub const ENV_DATA_DIR: &str = "LIVITH_DATA_DIR";
/// Environment variable for the database file
pub const ENV_DATABASE: &str = "LIVITH_DATABASE";
/// Environment variable for the bind address
pub const ENV_BIND: &str = "LIVITH_BIND";
/// Environment variable for the admin password
pub const ENV_ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";
/// Environment variable for the log filter
pub const ENV_LOG: &str = "LIVITH_LOG";

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:5730";
/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "livith.db";
/// Draft file name inside the data directory
pub const DRAFT_FILE: &str = "livith_temp_save.json";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind: Option<String>,
    pub admin_password: Option<String>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub bind: Option<String>,
}

/// Fully resolved dashboard configuration
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub draft_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// `None` means login is impossible (every attempt returns 500)
    pub admin_password: Option<String>,
    pub log_level: String,
}

impl DashConfig {
    /// Resolve configuration from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let toml_config = match &cli.config {
            Some(path) => TomlConfig::load(path)?,
            None => match default_config_file() {
                Some(path) => {
                    info!("Loading config file: {}", path.display());
                    TomlConfig::load(&path)?
                }
                None => TomlConfig::default(),
            },
        };

        Self::from_sources(cli, &toml_config)
    }

    /// Merge already-loaded sources (CLI > env > TOML > default)
    pub fn from_sources(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| env_var(ENV_DATA_DIR).map(PathBuf::from))
            .or_else(|| toml_config.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        let database_path = cli
            .database
            .clone()
            .or_else(|| env_var(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| toml_config.database.clone())
            .unwrap_or_else(|| data_dir.join(DATABASE_FILE));

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_var(ENV_BIND))
            .or_else(|| toml_config.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind, e)))?;

        let admin_password = env_var(ENV_ADMIN_PASSWORD)
            .or_else(|| toml_config.admin_password.clone())
            .filter(|p| !p.is_empty());
        if admin_password.is_none() {
            warn!("No admin password configured; login is disabled");
        }

        let log_level = env_var(ENV_LOG)
            .or_else(|| toml_config.log_level.clone())
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            draft_path: data_dir.join(DRAFT_FILE),
            data_dir,
            database_path,
            bind_addr,
            admin_password,
            log_level,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// First existing config file: `~/.config/livith/config.toml`, then
/// `/etc/livith/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("livith").join("config.toml"));
    let system_config = PathBuf::from("/etc/livith/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|p| p.exists())
}

/// Platform data directory (`~/.local/share/livith` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("livith"))
        .unwrap_or_else(|| PathBuf::from("./livith_data"))
}
