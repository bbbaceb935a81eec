// Store error type. NotFound stays typed so callers can map it to a 404.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("server not found: {server_id}")]
    NotFound { server_id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(server_id: impl Into<String>) -> Self {
        StoreError::NotFound {
            server_id: server_id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
