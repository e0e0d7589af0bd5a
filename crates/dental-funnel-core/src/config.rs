//! Runtime configuration.
//!
//! Loaded from an optional `config/funnel.toml` (section `[funnel]`), then
//! overlaid by `DENTAL_FUNNEL__FUNNEL__<KEY>` environment variables.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config/funnel.toml";
const ENV_PREFIX: &str = "DENTAL_FUNNEL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FunnelConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Call summaries returned with a patient
    #[serde(default = "default_recent_call_log_limit")]
    pub recent_call_log_limit: usize,
    /// Local hour recall messages are scheduled at
    #[serde(default = "default_recall_send_hour")]
    pub recall_send_hour: u32,
    #[serde(default = "default_top_region_limit")]
    pub top_region_limit: usize,
    /// Name used in recall messages when the patient has none
    #[serde(default = "default_patient_name")]
    pub default_patient_name: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_database_path() -> String {
    "dental_funnel.db".to_string()
}

fn default_recent_call_log_limit() -> usize {
    10
}

fn default_recall_send_hour() -> u32 {
    10
}

fn default_top_region_limit() -> usize {
    5
}

fn default_patient_name() -> String {
    "고객".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            recent_call_log_limit: default_recent_call_log_limit(),
            recall_send_hour: default_recall_send_hour(),
            top_region_limit: default_top_region_limit(),
            default_patient_name: default_patient_name(),
            log_filter: default_log_filter(),
        }
    }
}

impl FunnelConfig {
    /// Load from `config/funnel.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given TOML file (optional) and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded = match settings.get::<FunnelConfig>("funnel") {
            Ok(cfg) => cfg,
            Err(ConfigError::NotFound(_)) => FunnelConfig::default(),
            Err(e) => return Err(e),
        };
        loaded.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.recall_send_hour > 23 {
            return Err(ConfigError::Message(format!(
                "recall_send_hour must be 0-23, got {}",
                self.recall_send_hour
            )));
        }
        Ok(self)
    }
}
