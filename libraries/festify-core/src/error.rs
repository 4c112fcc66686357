/// Core error types for Festify
use thiserror::Error;

/// Result type alias using `FestifyError`
pub type Result<T> = std::result::Result<T, FestifyError>;

/// Core error type for Festify
#[derive(Error, Debug)]
pub enum FestifyError {
    /// Missing party id, unknown party, or a party without a creation timestamp
    #[error("Invalid party: {0}")]
    InvalidParty(String),

    /// Track key that is not of the form `{provider}-{id}`
    #[error("Invalid track id: {0}")]
    InvalidTrackId(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored document that does not match its expected shape
    #[error("Invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// Opaque failure surfaced by a document store
    #[error("Store error: {0}")]
    Store(String),

    /// The optimistic retry budget ran out before a commit succeeded
    #[error("Transaction on {path} aborted after {attempts} attempts")]
    TransactionAborted { path: String, attempts: u32 },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Database errors (for storage implementations)
    #[error("Database error: {0}")]
    Database(String),
}

impl FestifyError {
    /// Create an invalid party error
    pub fn invalid_party(msg: impl Into<String>) -> Self {
        Self::InvalidParty(msg.into())
    }

    /// Create an invalid track id error
    pub fn invalid_track_id(msg: impl Into<String>) -> Self {
        Self::InvalidTrackId(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid document error
    pub fn invalid_document(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error was raised by input validation, before any store access
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParty(_) | Self::InvalidTrackId(_) | Self::InvalidInput(_)
        )
    }
}

#[cfg(feature = "sqlx-support")]
impl From<sqlx::Error> for FestifyError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(FestifyError::invalid_party("missing id").is_validation());
        assert!(FestifyError::invalid_track_id("abc").is_validation());
        assert!(!FestifyError::store("permission denied").is_validation());
        assert!(!FestifyError::TransactionAborted {
            path: "tracks/p/spotify-a".to_string(),
            attempts: 25,
        }
        .is_validation());
    }

    #[test]
    fn aborted_message_names_path() {
        let err = FestifyError::TransactionAborted {
            path: "tracks/p/spotify-a".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Transaction on tracks/p/spotify-a aborted after 3 attempts"
        );
    }
}
