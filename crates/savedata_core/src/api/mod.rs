//! Remote save service contract.
//!
//! Transport is left to the implementor. Raw responses are mapped onto
//! [`ApiError`] by [`classify_fetch`] and [`classify_write`].

use crate::save::SaveError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NOT_FOUND_MARKER: &str = "sql: no rows";
const OVERLOAD_MARKER: &str = "Too many connections";
const STALE_MARKER: &str = "session out of date";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("no save stored on the server")]
    NotFound,

    #[error("server is overloaded")]
    Overloaded,

    #[error("client session is out of date")]
    StaleSession,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<ApiError> for SaveError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Overloaded => SaveError::RemoteOverloaded,
            ApiError::StaleSession => SaveError::StaleSession,
            ApiError::NotFound => SaveError::Remote("not found".to_string()),
            ApiError::Rejected(msg) | ApiError::Transport(msg) => SaveError::Remote(msg),
        }
    }
}

fn classify_marker(body: &str) -> Option<ApiError> {
    if body.contains(STALE_MARKER) {
        Some(ApiError::StaleSession)
    } else if body.contains(OVERLOAD_MARKER) {
        Some(ApiError::Overloaded)
    } else if body.starts_with(NOT_FOUND_MARKER) {
        Some(ApiError::NotFound)
    } else {
        None
    }
}

/// Map a fetch response onto the save JSON or a typed failure.
pub fn classify_fetch(status: u16, body: &str) -> Result<String, ApiError> {
    if status == 404 {
        return Err(ApiError::NotFound);
    }
    if let Some(err) = classify_marker(body) {
        return Err(err);
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::Rejected(format!("HTTP {status}: {}", body.trim())));
    }
    if body.trim().is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(body.to_string())
}

/// Writes answer with an empty body on success, an error string otherwise.
pub fn classify_write(body: &str) -> Result<(), ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(());
    }
    Err(classify_marker(body).unwrap_or_else(|| ApiError::Rejected(body.to_string())))
}

/// Combined system + session write applied atomically by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAllRequest {
    pub system: String,
    pub session: String,
    pub session_slot_id: u8,
    pub client_session_id: String,
}

/// Remote save endpoints. Every write carries the client session id so the
/// server can detect a second client writing over the same account.
#[async_trait(?Send)]
pub trait SaveApi {
    async fn get_system(&self, client_session_id: &str) -> Result<String, ApiError>;

    async fn put_system(&self, client_session_id: &str, system: &str) -> Result<(), ApiError>;

    async fn get_session(&self, slot: u8, client_session_id: &str) -> Result<String, ApiError>;

    async fn put_session(&self, slot: u8, client_session_id: &str, session: &str) -> Result<(), ApiError>;

    async fn delete_session(&self, slot: u8, client_session_id: &str) -> Result<(), ApiError>;

    /// End a run: the server records it and frees the slot.
    async fn clear_session(&self, slot: u8, client_session_id: &str, session: &str) -> Result<(), ApiError>;

    async fn update_all(&self, request: &UpdateAllRequest) -> Result<(), ApiError>;
}

/// No server at all: nothing is ever found and every write succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineApi;

#[async_trait(?Send)]
impl SaveApi for OfflineApi {
    async fn get_system(&self, _client_session_id: &str) -> Result<String, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn put_system(&self, _client_session_id: &str, _system: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn get_session(&self, _slot: u8, _client_session_id: &str) -> Result<String, ApiError> {
        Err(ApiError::NotFound)
    }

    async fn put_session(&self, _slot: u8, _client_session_id: &str, _session: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete_session(&self, _slot: u8, _client_session_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn clear_session(&self, _slot: u8, _client_session_id: &str, _session: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn update_all(&self, _request: &UpdateAllRequest) -> Result<(), ApiError> {
        Ok(())
    }
}
