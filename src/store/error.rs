//! Error types for the persistence layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("conversation {0} does not exist")]
    ConversationNotFound(i64),

    #[error("invalid role value in storage: {0}")]
    InvalidRole(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
