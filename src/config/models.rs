// src/config/models.rs
use crate::notify::NotifyPolicy;
use crate::probe::Target;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sites: Vec<TargetConfig>,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub status_server: StatusServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub url: String,
    /// Seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between periodic sweeps.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_concurrent_checks")]
    pub concurrent_checks: usize,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub console_output: bool,
    #[serde(default)]
    pub policy: NotifyPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_status_port")]
    pub port: u16,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no sites configured")]
    NoSites,

    #[error("site #{0} has an empty name")]
    EmptyName(usize),

    #[error("duplicate site name '{0}'")]
    DuplicateName(String),

    #[error("site '{0}' has a zero timeout")]
    ZeroTimeout(String),

    #[error("check_interval must be greater than zero")]
    ZeroInterval,

    #[error("concurrent_checks must be at least 1")]
    ZeroConcurrency,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_check_interval() -> u64 {
    300
}

fn default_concurrent_checks() -> usize {
    5
}

fn default_status_port() -> u16 {
    9090
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            concurrent_checks: default_concurrent_checks(),
            follow_redirects: true,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            console_output: true,
            policy: NotifyPolicy::default(),
        }
    }
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_status_port(),
        }
    }
}

impl Config {
    /// URLs are deliberately not checked here: a malformed URL is reported
    /// per sweep as a request-creation failure for that site.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }

        let mut seen = HashSet::new();
        for (index, site) in self.sites.iter().enumerate() {
            if site.name.trim().is_empty() {
                return Err(ConfigError::EmptyName(index));
            }
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::DuplicateName(site.name.clone()));
            }
            if site.timeout == 0 {
                return Err(ConfigError::ZeroTimeout(site.name.clone()));
            }
        }

        if self.general.check_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.general.concurrent_checks == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(())
    }

    /// Targets in file order.
    pub fn targets(&self) -> Vec<Target> {
        self.sites
            .iter()
            .map(|site| Target::new(&site.name, &site.url, Duration::from_secs(site.timeout)))
            .collect()
    }
}

impl GeneralConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }
}
