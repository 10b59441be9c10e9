//! Polling worker driving periodic refreshes

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Name used in logs
    pub name: &'static str,

    /// Polling interval
    pub interval: Duration,
}

/// Run the poller worker.
///
/// Calls `on_tick` every `interval` until `shutdown_signal` resolves. `on_tick` must not
/// block; it is expected to spawn the actual work so a slow fetch never delays the next
/// tick. A notification on `reset` restarts the interval from now without ticking.
pub async fn run<T, S, F>(
    options: &Options,
    on_tick: T,
    reset: Arc<Notify>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    T: Fn(),
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "{} poller starting, refreshing every {:?}",
        options.name, options.interval
    );

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("{} poller shutting down...", options.name);
                return;
            }
            _ = reset.notified() => {
                debug!("{} poller interval restarted", options.name);
                continue;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with tick
            }
        }

        debug!("{} poller tick", options.name);
        on_tick();
    }
}
