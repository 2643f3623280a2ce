use super::keys::SaveCategory;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Decryption failed: {reason}")]
    Decryption { reason: String },

    #[error("Migration '{migrator}' ({version}) failed: {reason}")]
    Migration { migrator: &'static str, version: String, reason: String },

    #[error("Invalid game version: {0}")]
    InvalidVersion(String),

    #[error("Remote save service is overloaded, try again later")]
    RemoteOverloaded,

    #[error("Remote save request failed: {0}")]
    Remote(String),

    #[error("Client session is out of date, reload required")]
    StaleSession,

    #[error("Invalid {category} data: {reason}")]
    Validation { category: SaveCategory, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid save slot: {slot}")]
    InvalidSlot { slot: u8 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("System save has not been loaded")]
    NotLoaded,
}

impl SaveError {
    /// The same request may succeed later without any change on our side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SaveError::RemoteOverloaded | SaveError::Remote(_) | SaveError::Io(_))
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            SaveError::Io(_) => true,
            SaveError::RemoteOverloaded => true,
            SaveError::Remote(_) => true,
            SaveError::StaleSession => true, // Reload and retry
            SaveError::Validation { .. } => true, // Store untouched
            _ => false,
        }
    }

    /// Load attempts treat these as "this blob is unusable".
    pub fn is_corrupt_data(&self) -> bool {
        matches!(
            self,
            SaveError::Parse(_)
                | SaveError::Decryption { .. }
                | SaveError::Migration { .. }
                | SaveError::InvalidVersion(_)
        )
    }

    pub(crate) fn validation(category: SaveCategory, reason: impl Into<String>) -> Self {
        SaveError::Validation { category, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_is_retryable_but_corruption_is_not() {
        assert!(SaveError::RemoteOverloaded.is_retryable());
        assert!(!SaveError::Decryption { reason: "bad tag".into() }.is_retryable());
        assert!(SaveError::Decryption { reason: "bad tag".into() }.is_corrupt_data());
        assert!(!SaveError::RemoteOverloaded.is_corrupt_data());
    }

    #[test]
    fn corrupt_blobs_are_not_recoverable() {
        assert!(SaveError::StaleSession.is_recoverable());
        assert!(SaveError::validation(SaveCategory::System, "missing dex data").is_recoverable());
        assert!(!SaveError::InvalidSlot { slot: 9 }.is_recoverable());
        assert!(!SaveError::Decryption { reason: "bad tag".into() }.is_recoverable());
        assert!(!SaveError::NotLoaded.is_recoverable());
    }

    #[test]
    fn validation_message_names_category() {
        let err = SaveError::validation(SaveCategory::Session, "party is empty");
        assert_eq!(err.to_string(), "Invalid session data: party is empty");
    }
}
