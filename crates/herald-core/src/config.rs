//! Configuration loading and typed config structures for the Herald
//! simulation.
//!
//! The configuration is a YAML document with four optional sections:
//! `simulation`, `messaging`, `logging`, and `report`. Every field has a
//! default, so an empty document is a valid configuration.

use std::path::{Path, PathBuf};

use herald_acl::MessageTags;
use serde::Deserialize;

/// Environment variable overriding `report.message_log_path`.
pub const MESSAGE_LOG_ENV: &str = "HERALD_MESSAGE_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but a value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Which value was rejected and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Run boundaries and seed.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Tags stamped on new conversations.
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Post-run report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `HERALD_MESSAGE_LOG`, when set, overrides `report.message_log_path`.
    /// The result is validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied and the result is not validated.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up through `lookup` (normally the process
    /// environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(MESSAGE_LOG_ENV).filter(|p| !p.is_empty()) {
            self.report.message_log_path = Some(PathBuf::from(path));
        }
    }

    /// Reject values the run loop cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.max_ticks == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("simulation.max_ticks must be at least 1"),
            });
        }
        Ok(())
    }
}

/// Run boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Human-readable scenario name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Hard upper bound on ticks.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Real-time milliseconds between ticks; 0 runs as fast as possible.
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Stop early once a tick routes nothing, fires nothing, and leaves no
    /// pending work.
    #[serde(default = "default_true")]
    pub stop_when_quiescent: bool,

    /// Seed for stimulus generation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_ticks: default_max_ticks(),
            tick_interval_ms: 0,
            stop_when_quiescent: true,
            seed: default_seed(),
        }
    }
}

/// Opaque message tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessagingConfig {
    /// Content language tag.
    #[serde(default = "default_language")]
    pub language: String,

    /// Ontology tag.
    #[serde(default = "default_ontology")]
    pub ontology: String,

    /// Interaction protocol tag.
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl MessagingConfig {
    /// The tags in the form agents take them.
    pub fn tags(&self) -> MessageTags {
        MessageTags {
            language: self.language.clone(),
            ontology: self.ontology.clone(),
            protocol: self.protocol.clone(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            ontology: default_ontology(),
            protocol: default_protocol(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Post-run report settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportConfig {
    /// Where to write the JSON message log; no file when absent.
    #[serde(default)]
    pub message_log_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_name() -> String {
    String::from("Disaster Response Simulation")
}

const fn default_max_ticks() -> u64 {
    50
}

const fn default_true() -> bool {
    true
}

const fn default_seed() -> u64 {
    42
}

fn default_language() -> String {
    String::from(herald_acl::DEFAULT_LANGUAGE)
}

fn default_ontology() -> String {
    String::from(herald_acl::DEFAULT_ONTOLOGY)
}

fn default_protocol() -> String {
    String::from(herald_acl::DEFAULT_PROTOCOL)
}

fn default_log_level() -> String {
    String::from("info")
}
