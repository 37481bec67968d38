//! Configuration loaded from TOML
//!
//! Every section and key is optional; omitted values fall back to the
//! defaults below. Reading the file is left to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    DEFAULT_COLLECTOR_TIMEOUT_SECS, DOMAIN_CHECK_INTERVAL_SECS, EMAIL_CHECK_INTERVAL_SECS,
    SOCIAL_CHECK_INTERVAL_SECS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Attach a copy of the identity with emails and phone numbers masked
    #[serde(default)]
    pub redact: bool,
}

/// Recheck intervals for derived monitoring points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_social_interval")]
    pub social_interval_secs: u64,
    #[serde(default = "default_domain_interval")]
    pub domain_interval_secs: u64,
    #[serde(default = "default_email_interval")]
    pub email_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_collector_timeout")]
    pub collector_timeout_secs: u64,
}

impl Config {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    pub fn default_template() -> String {
        let template = r#"[profile]
redact = false

[monitoring]
social_interval_secs = 3600
domain_interval_secs = 86400
email_interval_secs = 604800

[runtime]
collector_timeout_secs = 30
"#;
        template.to_string()
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            social_interval_secs: default_social_interval(),
            domain_interval_secs: default_domain_interval(),
            email_interval_secs: default_email_interval(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            collector_timeout_secs: default_collector_timeout(),
        }
    }
}

fn default_social_interval() -> u64 {
    SOCIAL_CHECK_INTERVAL_SECS
}

fn default_domain_interval() -> u64 {
    DOMAIN_CHECK_INTERVAL_SECS
}

fn default_email_interval() -> u64 {
    EMAIL_CHECK_INTERVAL_SECS
}

fn default_collector_timeout() -> u64 {
    DEFAULT_COLLECTOR_TIMEOUT_SECS
}
