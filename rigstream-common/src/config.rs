//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from (highest priority first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! A missing TOML file is never fatal: the caller gets a warning and the
//! compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RIGSTREAM_ROOT_FOLDER";

/// Database file name used when no explicit path is configured
pub const DEFAULT_DATABASE_FILE: &str = "drilling_data.db";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the root folder that holds the database
///
/// `toml_value` is the `root_folder` key from the loaded config file, if any.
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Resolve the database path: explicit value, else `drilling_data.db` in the root folder
///
/// Relative explicit paths are taken relative to the root folder.
pub fn resolve_database_path(root_folder: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root_folder.join(path),
        None => root_folder.join(DEFAULT_DATABASE_FILE),
    }
}

/// Locate the default configuration file for the platform
///
/// Tries `<config_dir>/rigstream/config.toml` first, then
/// `/etc/rigstream/config.toml` on Unix.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rigstream").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/rigstream/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML bootstrap config
///
/// An explicitly requested file must exist and parse. Without an explicit
/// path the platform default locations are searched, and `T::default()` is
/// returned when none exists.
pub fn load_toml_config<T>(explicit: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("No config file found, using compiled defaults");
                return Ok(T::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/rigstream (or /var/lib/rigstream for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("rigstream"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/rigstream"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/rigstream
        dirs::data_dir()
            .map(|d| d.join("rigstream"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/rigstream"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\rigstream
        dirs::data_local_dir()
            .map(|d| d.join("rigstream"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\rigstream"))
    } else {
        PathBuf::from("./rigstream_data")
    }
}
