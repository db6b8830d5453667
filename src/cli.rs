//! Command-line interface.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{ConfigError, DashboardConfig};

#[derive(Debug, Parser)]
#[command(
    name = "gridviz",
    about = "Terminal dashboards for time-stepped grid simulation outputs",
    version
)]
pub struct Cli {
    /// Built-in dashboard preset (voltage, ev)
    #[arg(long, conflicts_with = "config")]
    pub preset: Option<String>,

    /// Dashboard configuration TOML file
    #[arg(long, env = "GRIDVIZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read every data source from this directory instead of its URL
    #[arg(long, env = "GRIDVIZ_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Play back without a terminal UI, logging one line per timestep
    #[arg(long)]
    pub headless: bool,

    /// Timesteps to play in headless mode (default: one full horizon)
    #[arg(long, requires = "headless")]
    pub steps: Option<usize>,

    /// Write every headless frame to this CSV file
    #[arg(long, requires = "headless")]
    pub export: Option<PathBuf>,

    /// Write logs to this file (the terminal UI otherwise discards them)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolves the configuration: `--config`, else `--preset`, else the voltage
    /// preset; then applies `--data-dir`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown preset or an unreadable/invalid file.
    pub fn resolve_config(&self) -> Result<DashboardConfig, ConfigError> {
        let mut cfg = if let Some(path) = &self.config {
            DashboardConfig::from_toml_file(path)?
        } else if let Some(name) = &self.preset {
            DashboardConfig::from_preset(name)?
        } else {
            DashboardConfig::voltage()
        };
        if let Some(dir) = &self.data_dir {
            cfg.data.relocate(dir);
        }
        Ok(cfg)
    }

    /// Default log level before `RUST_LOG` directives apply.
    pub fn log_level(&self) -> tracing::Level {
        match (self.verbose, self.headless) {
            (0, true) => tracing::Level::INFO,
            (0, false) => tracing::Level::WARN,
            (1, _) => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
