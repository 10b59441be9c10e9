//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Environment variable overriding the backend base URL
pub const API_URL_ENV_VAR: &str = "CICD_API_URL";

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Also write logs to daily files in the storage directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Refresh intervals of the live views
    #[serde(default)]
    pub refresh: RefreshSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            json_logs: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            refresh: RefreshSettings::default(),
        }
    }
}

impl Settings {
    /// Backend URL, honoring the environment override
    pub fn backend_base_url(&self) -> String {
        std::env::var(API_URL_ENV_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.backend.base_url.clone())
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Upper bound for a single request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Polling intervals; 0 disables periodic refresh for that view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    #[serde(default = "default_builds_interval")]
    pub builds_secs: u64,

    #[serde(default = "default_deployments_interval")]
    pub deployments_secs: u64,

    #[serde(default)]
    pub projects_secs: u64,

    #[serde(default)]
    pub pipelines_secs: u64,
}

fn default_builds_interval() -> u64 {
    10
}

fn default_deployments_interval() -> u64 {
    15
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            builds_secs: default_builds_interval(),
            deployments_secs: default_deployments_interval(),
            projects_secs: 0,
            pipelines_secs: 0,
        }
    }
}
