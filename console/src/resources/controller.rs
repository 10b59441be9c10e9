//! Generic polling resource controller
//!
//! One controller backs one list view. It keeps the last fetched snapshot, a loading
//! flag, a local filter and the server-side parameters, and refreshes on a fixed
//! interval when the resource has one.
//!
//! Every fetch is tagged with a sequence number taken under the state lock. A
//! response is applied only if its number is still the latest issued and the
//! controller has not been stopped, so a slow early response can never overwrite
//! a newer one and nothing changes after teardown.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::workers::poller;

/// Client-side filter over a snapshot
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Predicate letting every item through
pub fn match_all<T>() -> Predicate<T> {
    Arc::new(|_| true)
}

/// A remote collection a controller can keep fresh
#[async_trait]
pub trait ResourceSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Server-side query parameters
    type Params: Clone + Default + fmt::Debug + Send + Sync + 'static;

    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Periodic refresh interval, `None` for refresh on demand only
    fn refresh_interval(&self) -> Option<Duration>;

    /// Identity of an item, used to track in-flight actions
    fn key(item: &Self::Item) -> u64;

    /// Fetch the full collection for `params`
    async fn fetch(&self, params: &Self::Params) -> Result<Vec<Self::Item>, ConsoleError>;
}

struct ControllerState<S: ResourceSource> {
    items: Vec<S::Item>,
    loading: bool,
    filter: Predicate<S::Item>,
    params: S::Params,

    /// Sequence number of the last issued fetch
    issued: u64,

    /// Sequence number of the snapshot in `items`
    applied: u64,

    stopped: bool,
    last_error: Option<String>,
    pending: HashSet<u64>,
}

struct Ticker {
    reset: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

struct Inner<S: ResourceSource> {
    source: S,
    state: Mutex<ControllerState<S>>,
    ticker: Mutex<Option<Ticker>>,
    changes: watch::Sender<u64>,
}

/// Keeps one remote collection fresh for a view
pub struct ResourceController<S: ResourceSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ResourceSource> Clone for ResourceController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Keeps an item key in the pending set until dropped, even when the action
/// future is abandoned midway
struct PendingAction<'a, S: ResourceSource> {
    controller: &'a ResourceController<S>,
    key: Option<u64>,
}

impl<'a, S: ResourceSource> PendingAction<'a, S> {
    fn mark(controller: &'a ResourceController<S>, key: Option<u64>) -> Self {
        if let Some(key) = key {
            controller.lock_state().pending.insert(key);
            controller.notify_changed();
        }
        Self { controller, key }
    }
}

impl<S: ResourceSource> Drop for PendingAction<'_, S> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.controller.lock_state().pending.remove(&key);
            self.controller.notify_changed();
        }
    }
}

impl<S: ResourceSource> ResourceController<S> {
    pub fn new(source: S) -> Self {
        Self::with_params(source, S::Params::default())
    }

    pub fn with_params(source: S, params: S::Params) -> Self {
        let (changes, _rx) = watch::channel(0);

        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(ControllerState {
                    items: Vec::new(),
                    loading: false,
                    filter: match_all(),
                    params,
                    issued: 0,
                    applied: 0,
                    stopped: false,
                    last_error: None,
                    pending: HashSet::new(),
                }),
                ticker: Mutex::new(None),
                changes,
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Fetch now and, if the resource polls, keep refreshing on its interval
    pub async fn start(&self) -> Result<(), ConsoleError> {
        self.lock_state().stopped = false;

        if let Some(interval) = self.inner.source.refresh_interval() {
            self.spawn_ticker(interval);
        }

        self.refresh_now().await
    }

    /// Cancel the ticker and ignore every response still in flight. Idempotent.
    pub fn stop(&self) {
        {
            let mut state = self.lock_state();
            if !state.stopped {
                state.stopped = true;
                state.loading = false;
            }
        }

        if let Some(mut ticker) = self.lock_ticker().take() {
            if let Some(shutdown) = ticker.shutdown.take() {
                let _ = shutdown.send(());
            }
            info!("{} controller stopped", self.inner.source.name());
        }
    }

    /// Fetch immediately, independent of the ticker
    pub async fn refresh_now(&self) -> Result<(), ConsoleError> {
        let (seq, params) = {
            let mut state = self.lock_state();
            state.issued += 1;
            if !state.stopped {
                state.loading = true;
            }
            (state.issued, state.params.clone())
        };
        self.notify_changed();

        debug!("{} fetch #{} with {:?}", self.inner.source.name(), seq, params);
        let result = self.inner.source.fetch(&params).await;

        self.apply(seq, result)
    }

    /// Replace the local filter; the snapshot is untouched and nothing is fetched
    pub fn set_filter(&self, filter: Predicate<S::Item>) {
        self.lock_state().filter = filter;
        self.notify_changed();
    }

    /// Change server-side parameters: restart the interval and fetch once
    pub async fn set_params(&self, params: S::Params) -> Result<(), ConsoleError> {
        self.lock_state().params = params;

        if let Some(ticker) = self.lock_ticker().as_ref() {
            ticker.reset.notify_one();
        }

        self.refresh_now().await
    }

    /// Last snapshot passed through the current filter
    pub fn visible(&self) -> Vec<S::Item> {
        let state = self.lock_state();
        state
            .items
            .iter()
            .filter(|item| (state.filter)(item))
            .cloned()
            .collect()
    }

    /// Last snapshot, unfiltered
    pub fn items(&self) -> Vec<S::Item> {
        self.lock_state().items.clone()
    }

    pub fn params(&self) -> S::Params {
        self.lock_state().params.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    /// Message of the last failed fetch, cleared by the next successful one
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Sequence number of the snapshot currently shown, 0 before the first one
    pub fn applied_seq(&self) -> u64 {
        self.lock_state().applied
    }

    pub fn is_stopped(&self) -> bool {
        self.lock_state().stopped
    }

    /// Whether an action on the item is in flight
    pub fn is_pending(&self, key: u64) -> bool {
        self.lock_state().pending.contains(&key)
    }

    /// Receiver bumped on every visible change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Run a user-triggered mutation, then refresh.
    ///
    /// While it runs `key` is reported as pending. A failure is returned as
    /// [`ConsoleError::ActionFailed`] and does not refresh.
    pub async fn perform<T, F>(&self, action: &str, key: Option<u64>, mutation: F) -> Result<T, ConsoleError>
    where
        F: Future<Output = Result<T, ConsoleError>>,
    {
        let pending = PendingAction::mark(self, key);

        info!("{}...", action);
        let result = mutation.await;
        drop(pending);

        match result {
            Ok(value) => {
                if let Err(e) = self.refresh_now().await {
                    debug!("Refresh after {} failed: {}", action, e);
                }
                Ok(value)
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                Err(ConsoleError::action(action, e))
            }
        }
    }

    fn apply(
        &self,
        seq: u64,
        result: Result<Vec<S::Item>, ConsoleError>,
    ) -> Result<(), ConsoleError> {
        let name = self.inner.source.name();
        let mut state = self.lock_state();

        if state.stopped {
            debug!("{} fetch #{} arrived after stop, dropped", name, seq);
            return result.map(|_| ());
        }

        if seq != state.issued {
            debug!(
                "{} fetch #{} superseded by #{}, dropped",
                name, seq, state.issued
            );
            return result.map(|_| ());
        }

        state.loading = false;
        let outcome = match result {
            Ok(items) => {
                debug!("{} fetch #{} applied, {} items", name, seq, items.len());
                state.items = items;
                state.applied = seq;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                // keep the previous snapshot on screen
                warn!("{} refresh failed: {}", name, e);
                state.last_error = Some(e.to_string());
                Err(e)
            }
        };
        drop(state);

        self.notify_changed();
        outcome
    }

    fn spawn_ticker(&self, interval: Duration) {
        let mut ticker = self.lock_ticker();
        if ticker.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("{} ticker already running", self.inner.source.name());
            return;
        }

        let reset = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let options = poller::Options {
            name: self.inner.source.name(),
            interval,
        };

        let controller = self.clone();
        let reset_rx = reset.clone();
        let handle = tokio::spawn(async move {
            poller::run(
                &options,
                move || controller.spawn_refresh(),
                reset_rx,
                |wait| tokio::time::sleep(wait),
                Box::pin(async move {
                    let _ = shutdown_rx.await;
                }),
            )
            .await;
        });

        *ticker = Some(Ticker {
            reset,
            shutdown: Some(shutdown_tx),
            handle,
        });
    }

    fn spawn_refresh(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            // failures are already recorded in the state and published by the gateway
            let _ = controller.refresh_now().await;
        });
    }

    fn notify_changed(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState<S>> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_ticker(&self) -> MutexGuard<'_, Option<Ticker>> {
        self.inner.ticker.lock().unwrap_or_else(|e| e.into_inner())
    }
}
