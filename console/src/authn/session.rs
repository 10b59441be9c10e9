//! Session store for user authentication

use std::sync::Arc;

use api_models::models::{UpdateProfileRequest, User};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::filesys::file::File;
use crate::http::gateway::Gateway;
use crate::storage::session::{clear_session, load_session, save_session, PersistedSession};

/// Where the console stands with respect to authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Startup, persisted session not read yet; nothing authenticated may render
    Resolving,
    Authenticated,
    Unauthenticated,
}

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,

    /// The backend rejected the token; the login surface must be shown
    Expired,
}

/// An authenticated user and their bearer token
#[derive(Debug)]
pub struct Session {
    user: User,
    token: SecretString,
}

impl Session {
    pub fn new(user: User, token: String) -> Self {
        Self {
            user,
            token: SecretString::from(token),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.token.expose_secret().to_string(),
            user: self.user.clone(),
        }
    }
}

/// Session store trait for testability
#[async_trait]
pub trait SessionStoreExt: Send + Sync {
    /// Copy of the current token, if any
    async fn current_token(&self) -> Option<String>;

    /// Drop the session that issued `token` after the backend rejected it.
    ///
    /// Returns `true` only for the call that actually cleared the session.
    async fn expire(&self, token: &str) -> bool;
}

/// Session store implementation
pub struct SessionStore {
    session_file: File,
    current: RwLock<Option<Arc<Session>>>,
    status_tx: watch::Sender<AuthStatus>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Create a store in the `Resolving` state; call [`SessionStore::restore`] next
    pub fn new(session_file: File) -> Self {
        let (status_tx, _status_rx) = watch::channel(AuthStatus::Resolving);
        let (events_tx, _events_rx) = broadcast::channel(16);

        Self {
            session_file,
            current: RwLock::new(None),
            status_tx,
            events_tx,
        }
    }

    /// Restore the persisted session at startup.
    ///
    /// A stored token is trusted without asking the backend; a bad token surfaces
    /// as a 401 on the first call.
    pub async fn restore(&self) -> AuthStatus {
        let status = match load_session(&self.session_file).await {
            Ok(Some(persisted)) => {
                info!("Restored session for {}", persisted.user.username);
                let session = Session::new(persisted.user, persisted.token);
                *self.current.write().await = Some(Arc::new(session));
                AuthStatus::Authenticated
            }
            Ok(None) => {
                debug!("No persisted session");
                AuthStatus::Unauthenticated
            }
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                AuthStatus::Unauthenticated
            }
        };

        self.status_tx.send_replace(status);
        status
    }

    /// Log in with credentials and persist the new session
    pub async fn login(
        &self,
        gateway: &Gateway,
        username: &str,
        password: &str,
    ) -> Result<User, ConsoleError> {
        info!("Logging in as {}", username);

        let response = gateway.login(username, password).await?;
        if response.token.is_empty() {
            return Err(ConsoleError::Decode(
                "login response carried no token".to_string(),
            ));
        }

        let user = response.user.clone();
        self.establish(Session::new(response.user, response.token))
            .await;

        let _ = self.events_tx.send(SessionEvent::LoggedIn {
            username: user.username.clone(),
        });
        info!("Logged in as {}", user.username);

        Ok(user)
    }

    /// Create an account; does not log in
    pub async fn register(
        &self,
        gateway: &Gateway,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ConsoleError> {
        info!("Registering {}", username);
        gateway.register(username, email, password).await
    }

    /// Forget the session. Never fails.
    pub async fn logout(&self) {
        let previous = self.current.write().await.take();

        if let Err(e) = clear_session(&self.session_file).await {
            warn!("Failed to remove persisted session: {}", e);
        }

        self.status_tx.send_replace(AuthStatus::Unauthenticated);

        if let Some(session) = previous {
            info!("Logged out {}", session.user().username);
            let _ = self.events_tx.send(SessionEvent::LoggedOut);
        }
    }

    /// Reload the user profile from the backend
    pub async fn refresh_profile(&self, gateway: &Gateway) -> Result<User, ConsoleError> {
        let user = gateway.get_profile().await?;
        self.replace_user(user.clone()).await;
        Ok(user)
    }

    /// Update email and/or avatar
    pub async fn update_profile(
        &self,
        gateway: &Gateway,
        changes: &UpdateProfileRequest,
    ) -> Result<User, ConsoleError> {
        let user = gateway.update_profile(changes).await?;
        self.replace_user(user.clone()).await;
        Ok(user)
    }

    pub fn status(&self) -> AuthStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AuthStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Wait until startup resolution is over
    pub async fn wait_resolved(&self) -> AuthStatus {
        let mut rx = self.subscribe_status();
        let status = match rx.wait_for(|status| *status != AuthStatus::Resolving).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        status
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.user().clone())
    }

    async fn establish(&self, session: Session) {
        if let Err(e) = save_session(&self.session_file, &session.to_persisted()).await {
            // the in-memory session still works for this run
            warn!("Failed to persist session: {}", e);
        }

        *self.current.write().await = Some(Arc::new(session));
        self.status_tx.send_replace(AuthStatus::Authenticated);
    }

    async fn replace_user(&self, user: User) {
        let mut current = self.current.write().await;
        let Some(session) = current.as_ref() else {
            debug!("Profile loaded without a session, not caching it");
            return;
        };

        let updated = Session::new(user, session.token().expose_secret().to_string());
        if let Err(e) = save_session(&self.session_file, &updated.to_persisted()).await {
            warn!("Failed to persist updated profile: {}", e);
        }
        *current = Some(Arc::new(updated));
    }
}

#[async_trait]
impl SessionStoreExt for SessionStore {
    async fn current_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token().expose_secret().to_string())
    }

    async fn expire(&self, token: &str) -> bool {
        {
            let mut current = self.current.write().await;
            match current.as_ref() {
                Some(session) if session.token().expose_secret() == token => {}
                _ => {
                    debug!("Session already cleared or replaced, ignoring stale 401");
                    return false;
                }
            }
            *current = None;
        }

        if let Err(e) = clear_session(&self.session_file).await {
            warn!("Failed to remove persisted session: {}", e);
        }

        self.status_tx.send_replace(AuthStatus::Unauthenticated);
        let _ = self.events_tx.send(SessionEvent::Expired);
        warn!("Session expired, login required");

        true
    }
}
