//! On-demand log viewer for builds and deployments

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::ConsoleError;
use crate::http::gateway::Gateway;

/// Shown when the server returned an empty log
pub const NO_LOGS_TEXT: &str = "No logs available";

/// Shown when the log could not be fetched
pub const FETCH_FAILED_TEXT: &str = "Failed to fetch logs";

/// Whose log to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTarget {
    Build(u64),
    Deployment(u64),
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::Build(id) => write!(f, "build:{}", id),
            LogTarget::Deployment(id) => write!(f, "deployment:{}", id),
        }
    }
}

impl FromStr for LogTarget {
    type Err = ConsoleError;

    /// Parse `build:<id>` or `deployment:<id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ConsoleError::ValidationError(format!(
                "Invalid log target '{}', expected build:<id> or deployment:<id>",
                s
            ))
        };

        let (kind, id) = s.split_once(':').ok_or_else(invalid)?;
        let id: u64 = id.trim().parse().map_err(|_| invalid())?;

        match kind.trim().to_lowercase().as_str() {
            "build" => Ok(LogTarget::Build(id)),
            "deployment" => Ok(LogTarget::Deployment(id)),
            _ => Err(invalid()),
        }
    }
}

/// Viewer lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewerState {
    #[default]
    Closed,
    Opening(LogTarget),
    Loaded { target: LogTarget, text: String },
    Failed { target: LogTarget, text: String },
}

impl ViewerState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, ViewerState::Closed)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewerState::Opening(_))
    }

    pub fn target(&self) -> Option<LogTarget> {
        match self {
            ViewerState::Closed => None,
            ViewerState::Opening(target)
            | ViewerState::Loaded { target, .. }
            | ViewerState::Failed { target, .. } => Some(*target),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ViewerState::Loaded { text, .. } | ViewerState::Failed { text, .. } => Some(text),
            _ => None,
        }
    }
}

struct ViewerInner {
    state: ViewerState,

    /// Bumped by every open and close; a response from an older generation is dropped
    generation: u64,
}

/// Fetches a full log on open and keeps it until closed
pub struct LogViewer {
    gateway: Arc<Gateway>,
    inner: Mutex<ViewerInner>,
    changes: watch::Sender<ViewerState>,
}

impl LogViewer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let (changes, _rx) = watch::channel(ViewerState::Closed);

        Self {
            gateway,
            inner: Mutex::new(ViewerInner {
                state: ViewerState::Closed,
                generation: 0,
            }),
            changes,
        }
    }

    /// Show the log of `target`, always fetching it anew.
    ///
    /// Returns the state after this open settled, which may be a later open's or
    /// `Closed` if the viewer moved on meanwhile. Never fails: fetch errors land in
    /// [`ViewerState::Failed`].
    pub async fn open(&self, target: LogTarget) -> ViewerState {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = ViewerState::Opening(target);
            self.changes.send_replace(inner.state.clone());
            inner.generation
        };

        debug!("Fetching logs of {}", target);
        let result = match target {
            LogTarget::Build(id) => self.gateway.get_build_logs(id).await,
            LogTarget::Deployment(id) => self.gateway.get_deployment_logs(id).await,
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("Logs of {} arrived for a stale open, dropped", target);
            return inner.state.clone();
        }

        inner.state = match result {
            Ok(text) if text.is_empty() => ViewerState::Loaded {
                target,
                text: NO_LOGS_TEXT.to_string(),
            },
            Ok(text) => ViewerState::Loaded { target, text },
            Err(e) => {
                warn!("Failed to fetch logs of {}: {}", target, e);
                ViewerState::Failed {
                    target,
                    text: FETCH_FAILED_TEXT.to_string(),
                }
            }
        };
        self.changes.send_replace(inner.state.clone());
        inner.state.clone()
    }

    /// Hide the viewer and discard the log
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = ViewerState::Closed;
        self.changes.send_replace(ViewerState::Closed);
    }

    pub fn state(&self) -> ViewerState {
        self.lock().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.changes.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, ViewerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
