//! Pipeline configuration.
//!
//! [`PipelineConfig::from_env`] reads the variables below; anything unset
//! keeps its default. The core types stay decoupled from environment
//! access and only ever see a resolved [`PipelineConfig`].

use crate::context::AppMetadata;
use crate::error::ConfigError;
use crate::record::Severity;

/// Service name reported on every record.
pub const LOG_PIPELINE_SERVICE_NAME_ENV: &str = "LOG_PIPELINE_SERVICE_NAME";

/// Logger name reported on every record.
pub const LOG_PIPELINE_LOGGER_NAME_ENV: &str = "LOG_PIPELINE_LOGGER_NAME";

/// Logger version reported on every record.
pub const LOG_PIPELINE_LOGGER_VERSION_ENV: &str = "LOG_PIPELINE_LOGGER_VERSION";

/// Full application version.
pub const LOG_PIPELINE_APP_VERSION_ENV: &str = "LOG_PIPELINE_APP_VERSION";

/// Short application version; preferred over the full version.
pub const LOG_PIPELINE_APP_SHORT_VERSION_ENV: &str = "LOG_PIPELINE_APP_SHORT_VERSION";

/// Minimum severity captured by the layer, e.g. `warn`.
pub const LOG_PIPELINE_MIN_SEVERITY_ENV: &str = "LOG_PIPELINE_MIN_SEVERITY";

/// Capacity of the channel between the layer and the sink task.
pub const LOG_PIPELINE_CHANNEL_BUFFER_ENV: &str = "LOG_PIPELINE_CHANNEL_BUFFER";

/// `true`/`false`: also print events to the console.
pub const LOG_PIPELINE_STDOUT_ENV: &str = "LOG_PIPELINE_STDOUT";

/// Configuration shared by the builder and the tracing layer.
///
/// **Fields**
/// - `service_name`, `logger_name`, `logger_version`: identity reported
///   on every record.
/// - `app`: application version metadata, resolved once per builder.
/// - `min_severity`: events below this severity are ignored by the layer.
/// - `channel_buffer`: records queued for the sink before new ones are
///   dropped.
/// - `enable_stdout`: if `true`, a `fmt` layer is installed next to the
///   record layer.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub service_name: String,
    pub logger_name: String,
    pub logger_version: String,
    pub app: AppMetadata,
    pub min_severity: Severity,
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            logger_name: env!("CARGO_PKG_NAME").to_string(),
            logger_version: env!("CARGO_PKG_VERSION").to_string(),
            app: AppMetadata::default(),
            min_severity: Severity::Error,
            channel_buffer: 1024,
            enable_stdout: true,
        }
    }
}

impl PipelineConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup(LOG_PIPELINE_SERVICE_NAME_ENV) {
            cfg.service_name = v;
        }
        if let Some(v) = lookup(LOG_PIPELINE_LOGGER_NAME_ENV) {
            cfg.logger_name = v;
        }
        if let Some(v) = lookup(LOG_PIPELINE_LOGGER_VERSION_ENV) {
            cfg.logger_version = v;
        }
        cfg.app = AppMetadata {
            short_version: lookup(LOG_PIPELINE_APP_SHORT_VERSION_ENV),
            full_version: lookup(LOG_PIPELINE_APP_VERSION_ENV),
        };
        if let Some(v) = lookup(LOG_PIPELINE_MIN_SEVERITY_ENV) {
            cfg.min_severity = Severity::parse(&v).ok_or_else(|| ConfigError::UnknownSeverity {
                var: LOG_PIPELINE_MIN_SEVERITY_ENV.to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup(LOG_PIPELINE_CHANNEL_BUFFER_ENV) {
            cfg.channel_buffer = v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: LOG_PIPELINE_CHANNEL_BUFFER_ENV.to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup(LOG_PIPELINE_STDOUT_ENV) {
            cfg.enable_stdout = parse_bool(&v).ok_or_else(|| ConfigError::InvalidBool {
                var: LOG_PIPELINE_STDOUT_ENV.to_string(),
                value: v.clone(),
            })?;
        }

        Ok(cfg)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
