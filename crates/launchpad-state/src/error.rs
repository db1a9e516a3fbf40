//! Error types for the Launchpad state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("failed to set up tables: {0}")]
    IndexSetup(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl StateError {
    /// True for a missing lookup or update target.
    ///
    /// On `get_next_unread_message` this is the ordinary "queue empty" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }

    /// True for a unique-constraint violation on insert.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StateError::DuplicateKey(_))
    }

    /// True when the backing database itself failed (open, transaction,
    /// table or I/O), as opposed to a logical outcome of the operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StateError::Open(_)
                | StateError::Transaction(_)
                | StateError::Table(_)
                | StateError::Read(_)
                | StateError::Write(_)
        )
    }
}
