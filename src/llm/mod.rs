//! Streaming LLM provider gateway

pub mod errors;
pub mod gateway;
pub mod provider;
pub mod types;

pub use errors::{LlmError, LlmResult};
pub use gateway::{CompletionBackend, ProviderGateway, SYSTEM_PROMPT};
pub use provider::Provider;
pub use types::{ChatMessage, MessageRole, TokenStream};
