//! Binds the UI-session lifecycle to persisted conversation state.
//!
//! One reconciler exists per live session. On start it decides between
//! creating a fresh conversation and resuming an existing one from the
//! thread identity the UI layer carries, then keeps the in-memory history
//! and the durable record in step turn by turn.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::StreamExt;
use tracing::{debug, info};

use crate::llm::{gateway::CompletionBackend, types::ChatMessage, MessageRole};
use crate::session::context::{SessionContext, SessionSettings};
use crate::session::surface::ChatSurface;
use crate::store::conversations::ConversationRepository;
use crate::store::users::Principal;

/// Maximum title length taken from the first user message.
pub const TITLE_MAX_CHARS: usize = 30;
const TITLE_SUFFIX: &str = "...";

const READY_NOTICE: &str = "Ready to chat. Pick a provider in the settings panel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Creating,
    Resuming,
    Active,
}

pub struct SessionReconciler {
    repo: Arc<ConversationRepository>,
    backend: Arc<dyn CompletionBackend>,
    state: SessionState,
    context: Option<SessionContext>,
}

impl SessionReconciler {
    pub fn new(repo: Arc<ConversationRepository>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            repo,
            backend,
            state: SessionState::Unstarted,
            context: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Resolve the session to a conversation and hydrate in-memory history.
    ///
    /// If the surface carries a numeric thread identity naming an existing
    /// conversation this is a resume: the full history is loaded from
    /// storage. Otherwise (no identity, or a stale handle whose conversation
    /// is gone) a new conversation row is created and the surface's thread
    /// identity is forced to the conversation id, which is the sole
    /// resumption handle.
    ///
    /// Resumption does not check that the principal owns the conversation;
    /// the external session layer is expected to enforce that.
    pub async fn start(
        &mut self,
        principal: &Principal,
        surface: &mut dyn ChatSurface,
    ) -> Result<()> {
        let handle = surface.thread_id().and_then(|id| id.parse::<i64>().ok());
        let resumable = match handle {
            Some(conversation_id) => self.repo.get(conversation_id).await?,
            None => None,
        };

        match resumable {
            Some(conversation) => {
                self.state = SessionState::Resuming;
                let history = self.repo.history(conversation.id).await?;
                debug!(
                    conversation_id = conversation.id,
                    turns = history.len(),
                    "resuming conversation"
                );
                self.context = Some(SessionContext::new(conversation.id, history));
            }
            None => {
                self.state = SessionState::Creating;
                let conversation = self.repo.create(principal.user_id, None).await?;
                surface.set_thread_id(conversation.id.to_string());
                info!(
                    conversation_id = conversation.id,
                    user_id = principal.user_id,
                    "created conversation"
                );
                self.context = Some(SessionContext::new(conversation.id, Vec::new()));
            }
        }

        self.state = SessionState::Active;
        surface.send_notice(READY_NOTICE).await?;
        Ok(())
    }

    /// Replace the provider selection for subsequent turns.
    pub fn update_settings(&mut self, settings: SessionSettings) {
        if let Some(context) = self.context.as_mut() {
            context.settings = settings;
        }
    }

    /// Process one user turn: persist the user message, stream the reply to
    /// the surface, persist the assistant message, and name the conversation
    /// after the first turn.
    ///
    /// The assistant row is written only after the fragment sequence is
    /// exhausted; a disconnect mid-stream records no assistant message.
    pub async fn handle_message(
        &mut self,
        content: &str,
        surface: &mut dyn ChatSurface,
    ) -> Result<()> {
        let context = self.context.as_mut().context("session not started")?;
        let first_turn = context.history.is_empty();

        self.repo
            .append(context.conversation_id, MessageRole::User, content)
            .await?;
        context.history.push(ChatMessage::new_user(content));

        let mut stream = self.backend.stream_response(
            context.history.clone(),
            context.settings.provider,
            context.settings.model.clone(),
        );

        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            surface.stream_token(&fragment).await?;
            reply.push_str(&fragment);
        }

        self.repo
            .append(context.conversation_id, MessageRole::Assistant, &reply)
            .await?;
        context.history.push(ChatMessage::new_assistant(&reply));

        if first_turn {
            let title = truncate_title(content);
            self.repo.rename(context.conversation_id, &title).await?;
            surface.rename_thread(&title).await?;
        }

        Ok(())
    }
}

/// Deterministic display title from the first user message: verbatim when it
/// fits, otherwise the first [`TITLE_MAX_CHARS`] characters plus a suffix.
pub fn truncate_title(content: &str) -> String {
    if content.chars().count() <= TITLE_MAX_CHARS {
        content.to_string()
    } else {
        let head: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}{TITLE_SUFFIX}")
    }
}
