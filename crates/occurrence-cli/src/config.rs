//! Layered configuration: defaults, then `rrq.toml`, then `RRQ_*` variables.

use std::path::Path;

use clap::ValueEnum;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use occurrence_engine::QueryLimits;
use serde::{Deserialize, Serialize};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "rrq.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One RFC 3339 timestamp per line
    #[default]
    Text,
    /// A JSON array of RFC 3339 strings
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
    pub output: OutputFormat,
    /// IANA zone for reading naive timestamps and rendering results.
    pub timezone: String,
    pub limits: QueryLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            output: OutputFormat::Text,
            timezone: "UTC".to_string(),
            limits: QueryLimits::default(),
        }
    }
}

impl Config {
    /// Nested keys use a double underscore, e.g. `RRQ_LIMITS__MAX_RANGE_RESULTS`.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("RRQ_").split("__"))
            .extract()
    }
}
