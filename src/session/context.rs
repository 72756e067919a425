//! Typed per-session state.
//!
//! Everything a live session keeps in memory lives here, replacing ad hoc
//! keyed session storage with one struct passed through the turn path.

use std::str::FromStr;

use crate::llm::{errors::LlmResult, provider::Provider, types::ChatMessage};

/// Provider selection for one session, parsed from the UI settings bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub provider: Provider,
    pub model: Option<String>,
}

impl SessionSettings {
    /// Parse raw settings-bag values. An unknown provider name fails here,
    /// before any turn is processed with it.
    pub fn parse(provider: &str, model: Option<String>) -> LlmResult<Self> {
        Ok(Self {
            provider: Provider::from_str(provider)?,
            model: model.filter(|m| !m.trim().is_empty()),
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: None,
        }
    }
}

/// In-memory mirror of one live conversation.
///
/// `history` caches the persisted turns so a turn does not re-read the full
/// conversation before calling the model; after every completed turn it holds
/// the same ordered sequence as the database.
#[derive(Debug)]
pub struct SessionContext {
    pub conversation_id: i64,
    pub history: Vec<ChatMessage>,
    pub settings: SessionSettings,
}

impl SessionContext {
    pub fn new(conversation_id: i64, history: Vec<ChatMessage>) -> Self {
        Self {
            conversation_id,
            history,
            settings: SessionSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn settings_parse_rejects_unknown_provider() {
        let err = SessionSettings::parse("groq", None).unwrap_err();
        assert!(matches!(err, LlmError::UnknownProvider(_)));
    }

    #[test]
    fn blank_model_override_is_treated_as_absent() {
        let settings = SessionSettings::parse("ollama", Some("  ".to_string())).unwrap();
        assert_eq!(settings.model, None);

        let settings = SessionSettings::parse("ollama", Some("mistral".to_string())).unwrap();
        assert_eq!(settings.model.as_deref(), Some("mistral"));
    }
}
