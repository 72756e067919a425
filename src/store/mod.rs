//! Relational persistence: users, conversations, messages

pub mod conversations;
pub mod database;
pub mod error;
pub mod users;

pub use conversations::{Conversation, ConversationRepository, MessageRecord, DEFAULT_TITLE};
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use users::{CredentialStore, Principal, User};
