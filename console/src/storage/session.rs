//! Session file management

use api_models::models::User;
use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;
use crate::filesys::file::File;

/// Session as stored on disk between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Bearer token issued at login
    pub token: String,

    /// Profile of the logged in user
    pub user: User,
}

/// Load the persisted session, `None` if there is none
pub async fn load_session(session_file: &File) -> Result<Option<PersistedSession>, ConsoleError> {
    if !session_file.exists().await {
        return Ok(None);
    }

    let session: PersistedSession = session_file.read_json().await.map_err(|e| {
        ConsoleError::StorageError(format!(
            "Failed to read session file {}: {}",
            session_file.path().display(),
            e
        ))
    })?;

    if session.token.is_empty() {
        return Ok(None);
    }

    Ok(Some(session))
}

/// Save the session, readable by the owner only
pub async fn save_session(
    session_file: &File,
    session: &PersistedSession,
) -> Result<(), ConsoleError> {
    session_file.write_private_json(session).await
}

/// Remove the persisted session
pub async fn clear_session(session_file: &File) -> Result<(), ConsoleError> {
    session_file.delete().await
}
