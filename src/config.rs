//! YAML configuration for the teleport binary.
//!
//! ```yaml
//! batch_interval: "5s"
//! database:
//!   name: source
//!   database: mydb
//!   hostname: localhost
//!   username: postgres
//!   password: postgres
//!   port: 5432
//! targets:
//!   replica:
//!     target_expression: "public.*"
//! ```

pub mod duration;

pub use duration::{parse_duration, parse_duration_to_secs};

use anyhow::Context;
use ddldiff::TargetExpression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_batch_interval() -> String {
    "5s".to_string()
}

fn default_port() -> u16 {
    5432
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How long the batcher sleeps between passes
    #[serde(default = "default_batch_interval")]
    pub batch_interval: String,
    pub database: DatabaseConfig,
    /// Targets keyed by name; the name is recorded on every batch
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Logical source name recorded on batches
    pub name: String,
    pub database: String,
    pub hostname: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub target_expression: String,
}

impl Config {
    /// Load and validate configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).context("Failed to parse YAML")?;
        config.batch_interval()?;
        config.target_expressions()?;
        Ok(config)
    }

    pub fn batch_interval(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.batch_interval)
            .with_context(|| format!("Invalid batch_interval: {}", self.batch_interval))
    }

    /// Compiled target expressions keyed by target name.
    pub fn target_expressions(&self) -> anyhow::Result<BTreeMap<String, TargetExpression>> {
        self.targets
            .iter()
            .map(|(name, target)| {
                let expression = TargetExpression::new(&target.target_expression)
                    .with_context(|| format!("Invalid target_expression for target {name}"))?;
                Ok((name.clone(), expression))
            })
            .collect()
    }
}

impl DatabaseConfig {
    /// libpq key/value connection string.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} user={} password={} dbname={} port={} sslmode=disable",
            conninfo_value(&self.hostname),
            conninfo_value(&self.username),
            conninfo_value(&self.password),
            conninfo_value(&self.database),
            self.port
        )
    }
}

/// Quote a conninfo value when it is empty or contains spaces, quotes or
/// backslashes.
fn conninfo_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
