//! Configuration for rigstream-ingest
//!
//! Sources, highest priority first:
//! 1. Command-line arguments (`--port`, `--bind`, `--root-folder`, `--database`)
//! 2. Environment variables (`RIGSTREAM_PORT`, `RIGSTREAM_ROOT_FOLDER`, `RIGSTREAM_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Everything here is bootstrap-only; a restart picks up changes.

use crate::analyzer::AnalyzerConfig;
use crate::registry::DEFAULT_SUBSCRIBER_BUFFER;
use clap::Parser;
use rigstream_common::config::{
    load_toml_config, resolve_database_path, resolve_root_folder, LoggingConfig,
};
use rigstream_common::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Command-line arguments for rigstream-ingest
#[derive(Parser, Debug, Default)]
#[command(name = "rigstream-ingest")]
#[command(about = "Drilling telemetry ingestion and live broadcast service")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "RIGSTREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Folder holding the event database
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Event database file (relative paths are inside the root folder)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "RIGSTREAM_PORT")]
    pub port: Option<u16>,
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub logging: LoggingConfig,
    pub ingest: IngestSettings,
    pub analyzer: AnalyzerConfig,
}

/// `[ingest]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Events a live subscriber may fall behind before it is dropped
    pub subscriber_buffer: usize,
    /// Upper bound on one analyzer invocation
    pub analyzer_timeout_ms: u64,
    /// History size when the request gives no limit
    pub history_default_limit: u32,
    /// Largest history a single request may ask for
    pub history_max_limit: u32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            analyzer_timeout_ms: 2000,
            history_default_limit: 50,
            history_max_limit: 1000,
        }
    }
}

impl IngestSettings {
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub logging: LoggingConfig,
    pub ingest: IngestSettings,
    pub analyzer: AnalyzerConfig,
}

impl Config {
    /// Load the TOML file named by `args` (or the platform default) and merge
    pub fn load(args: &Args) -> Result<Self> {
        let toml: TomlConfig = load_toml_config(args.config.as_deref())?;
        Self::resolve(args, toml)
    }

    /// Merge command-line values over a parsed TOML config
    pub fn resolve(args: &Args, toml: TomlConfig) -> Result<Self> {
        let root_folder =
            resolve_root_folder(args.root_folder.as_deref(), toml.root_folder.as_deref());
        let db_path = resolve_database_path(
            &root_folder,
            args.database.as_deref().or(toml.database_path.as_deref()),
        );

        let ip = args
            .bind
            .or(toml.bind)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = args.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        let ingest = toml.ingest;
        if ingest.analyzer_timeout_ms == 0 {
            return Err(Error::Config(
                "ingest.analyzer_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if ingest.history_default_limit > ingest.history_max_limit {
            return Err(Error::Config(format!(
                "ingest.history_default_limit ({}) exceeds ingest.history_max_limit ({})",
                ingest.history_default_limit, ingest.history_max_limit
            )));
        }

        Ok(Self {
            root_folder,
            db_path,
            bind_addr: SocketAddr::new(ip, port),
            logging: toml.logging,
            ingest,
            analyzer: toml.analyzer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_toml(text: &str) -> TomlConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let toml = parse_toml("");
        assert_eq!(toml.ingest.subscriber_buffer, DEFAULT_SUBSCRIBER_BUFFER);
        assert_eq!(toml.ingest.history_default_limit, 50);
        assert_eq!(toml.logging.level, "info");
        assert_eq!(toml.analyzer.min_flow_rate, 400.0);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = parse_toml(
            r#"
            port = 9100

            [ingest]
            subscriber_buffer = 16

            [analyzer]
            max_torque = 30.5
            "#,
        );
        assert_eq!(toml.port, Some(9100));
        assert_eq!(toml.ingest.subscriber_buffer, 16);
        assert_eq!(toml.ingest.analyzer_timeout_ms, 2000);
        assert_eq!(toml.analyzer.max_torque, 30.5);
        assert_eq!(toml.analyzer.min_rpm, 40.0);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let args = Args::try_parse_from([
            "rigstream-ingest",
            "--root-folder",
            "/srv/rig",
            "--port",
            "9200",
            "--bind",
            "127.0.0.1",
        ])
        .unwrap();
        let toml = parse_toml("port = 9100\ndatabase_path = \"events.db\"");

        let config = Config::resolve(&args, toml).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9200".parse().unwrap());
        assert_eq!(config.root_folder, PathBuf::from("/srv/rig"));
        assert_eq!(config.db_path, PathBuf::from("/srv/rig/events.db"));
    }

    #[test]
    fn test_default_bind_address() {
        let args = Args {
            root_folder: Some(PathBuf::from("/srv/rig")),
            ..Default::default()
        };
        let config = Config::resolve(&args, TomlConfig::default()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("/srv/rig/drilling_data.db"));
    }

    #[test]
    fn test_zero_analyzer_timeout_rejected() {
        let args = Args {
            root_folder: Some(PathBuf::from("/srv/rig")),
            ..Default::default()
        };
        let toml = parse_toml("[ingest]\nanalyzer_timeout_ms = 0");
        assert!(matches!(Config::resolve(&args, toml), Err(Error::Config(_))));
    }

    #[test]
    fn test_history_limits_must_be_consistent() {
        let args = Args {
            root_folder: Some(PathBuf::from("/srv/rig")),
            ..Default::default()
        };
        let toml = parse_toml("[ingest]\nhistory_default_limit = 500\nhistory_max_limit = 100");
        assert!(Config::resolve(&args, toml).is_err());
    }
}
