//! Live view run loop

use std::future::Future;

use api_models::models::User;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::app::state::AppState;
use crate::authn::session::{AuthStatus, SessionEvent};
use crate::errors::ConsoleError;
use crate::http::notifier::Notification;
use crate::resources::controller::{ResourceController, ResourceSource};

/// Where a live view draws itself
pub trait WatchView<T> {
    /// Draw a freshly applied snapshot, already filtered
    fn render(&mut self, items: &[T], stale_error: Option<&str>);

    /// Show a transient notification
    fn notify(&mut self, notification: &Notification);
}

/// Resolve the persisted session and require it to be authenticated.
///
/// Nothing authenticated may start before this returns.
pub async fn ensure_authenticated(state: &AppState) -> Result<User, ConsoleError> {
    state.session.restore().await;

    match state.session.wait_resolved().await {
        AuthStatus::Authenticated => state
            .session
            .current_user()
            .await
            .ok_or(ConsoleError::NotAuthenticated),
        _ => Err(ConsoleError::NotAuthenticated),
    }
}

/// Keep `controller` running and rendering until shutdown or session expiry.
///
/// Returns [`ConsoleError::AuthExpired`] when the backend rejected the session
/// meanwhile; the caller is expected to send the user back to login.
pub async fn watch<S, V>(
    state: &AppState,
    controller: &ResourceController<S>,
    view: &mut V,
    shutdown_signal: impl Future<Output = ()> + Send,
) -> Result<(), ConsoleError>
where
    S: ResourceSource,
    V: WatchView<S::Item>,
{
    let name = controller.source().name();
    info!("Watching {}...", name);

    let mut changes = controller.subscribe();
    let mut events = state.session.subscribe_events();
    let mut notifications = state.notifier.subscribe();
    tokio::pin!(shutdown_signal);

    if let Err(e) = controller.start().await {
        if e.is_auth_expired() {
            controller.stop();
            return Err(e);
        }
        warn!("Initial {} fetch failed: {}", name, e);
    }

    changes.mark_unchanged();
    render(controller, view);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, stopping {} view...", name);
                break Ok(());
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                // loading transitions are drawn once the fetch settles
                if !controller.is_loading() {
                    render(controller, view);
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Expired) => {
                    warn!("Session expired while watching {}", name);
                    break Err(ConsoleError::AuthExpired(
                        "session is no longer valid, please login again".to_string(),
                    ));
                }
                Ok(SessionEvent::LoggedOut) => {
                    break Err(ConsoleError::NotAuthenticated);
                }
                Ok(event) => debug!("Session event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} session events", skipped);
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            notification = notifications.recv() => match notification {
                Ok(notification) => view.notify(&notification),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} notifications", skipped);
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    controller.stop();
    info!("Stopped watching {}", name);
    result
}

fn render<S, V>(controller: &ResourceController<S>, view: &mut V)
where
    S: ResourceSource,
    V: WatchView<S::Item>,
{
    view.render(&controller.visible(), controller.last_error().as_deref());
}
