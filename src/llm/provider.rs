//! Closed enumeration of chat-completion providers.
//!
//! Provider names arrive as strings from the UI settings bag; they are parsed
//! into [`Provider`] at that boundary and everything downstream matches
//! exhaustively. An unrecognized name fails before any network call.

use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::llm::errors::{LlmError, LlmResult};

/// Models reported when the local registry cannot be reached.
pub const MODEL_LIST_FALLBACK: [&str; 2] = ["llama3", "mistral"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Ollama, Provider::OpenAi, Provider::OpenRouter];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Ollama => "llama3",
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::OpenRouter => "openai/gpt-3.5-turbo",
        }
    }

    /// Resolve the OpenAI-compatible endpoint for this provider.
    ///
    /// Hosted providers require an API key from configuration; a missing key
    /// is a configuration error raised before any I/O.
    pub fn endpoint(&self, config: &Config) -> LlmResult<ProviderEndpoint> {
        match self {
            Provider::Ollama => Ok(ProviderEndpoint {
                provider: *self,
                base_url: config.ollama_base_url.clone(),
                // The local endpoint ignores the key but the wire format
                // still wants a bearer token.
                api_key: "ollama".to_string(),
            }),
            Provider::OpenAi => {
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    LlmError::Config("OPENAI_API_KEY is not set".to_string())
                })?;
                Ok(ProviderEndpoint {
                    provider: *self,
                    base_url: "https://api.openai.com/v1".to_string(),
                    api_key,
                })
            }
            Provider::OpenRouter => {
                let api_key = config.openrouter_api_key.clone().ok_or_else(|| {
                    LlmError::Config("OPENROUTER_API_KEY is not set".to_string())
                })?;
                Ok(ProviderEndpoint {
                    provider: *self,
                    base_url: "https://openrouter.ai/api/v1".to_string(),
                    api_key,
                })
            }
        }
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> LlmResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved HTTP configuration for one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
}

impl ProviderEndpoint {
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// The Ollama model registry lives outside the OpenAI-compatible prefix.
    pub fn tags_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/').trim_end_matches("/v1");
        format!("{}/api/tags", base.trim_end_matches('/'))
    }
}
