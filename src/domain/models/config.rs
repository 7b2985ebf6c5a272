use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for scoped-memo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Which lifetime slot backs the external-lifetime tier
    #[serde(default)]
    pub lifetime: LifetimeKind,

    /// Instrumentation wrapper configuration
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lifetime slot used for the external-lifetime tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifetimeKind {
    /// One value per slot, shared by everyone holding the slot
    #[default]
    Container,
    /// One value per OS thread
    Thread,
    /// One value per tokio task-local scope
    Task,
}

impl LifetimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Thread => "thread",
            Self::Task => "task",
        }
    }
}

/// Instrumentation wrapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InstrumentationConfig {
    /// Wrap every public operation in a tracing span
    #[serde(default = "default_instrumentation_enabled")]
    pub enabled: bool,

    /// Operations slower than this are logged at warn level (0 disables)
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

const fn default_instrumentation_enabled() -> bool {
    true
}

const fn default_slow_threshold_ms() -> u64 {
    250
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            enabled: default_instrumentation_enabled(),
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
