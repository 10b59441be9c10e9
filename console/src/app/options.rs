//! Application configuration options

use std::time::Duration;

use crate::http::gateway::DEFAULT_TIMEOUT;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{RefreshSettings, Settings};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Upper bound for a single request
    pub request_timeout: Duration,

    /// Refresh intervals of the live views
    pub refresh: RefreshOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Notifications buffered per subscriber before the oldest are dropped
    pub notification_capacity: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080/api/v1".to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            refresh: RefreshOptions::default(),
            layout: StorageLayout::default(),
            notification_capacity: 64,
        }
    }
}

impl AppOptions {
    /// Options derived from the settings file
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            backend_base_url: settings.backend_base_url(),
            request_timeout: Duration::from_secs(settings.backend.request_timeout_secs.max(1)),
            refresh: RefreshOptions::from(&settings.refresh),
            layout,
            ..Default::default()
        }
    }
}

/// Periodic refresh per view; `None` means refresh on demand only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    pub builds: Option<Duration>,
    pub deployments: Option<Duration>,
    pub projects: Option<Duration>,
    pub pipelines: Option<Duration>,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::from(&RefreshSettings::default())
    }
}

impl From<&RefreshSettings> for RefreshOptions {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            builds: interval(settings.builds_secs),
            deployments: interval(settings.deployments_secs),
            projects: interval(settings.projects_secs),
            pipelines: interval(settings.pipelines_secs),
        }
    }
}

fn interval(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
