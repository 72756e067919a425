//! Session lifecycle: typed per-session state and the reconciler that binds
//! UI sessions to durable conversations

pub mod context;
pub mod reconciler;
pub mod surface;

pub use context::{SessionContext, SessionSettings};
pub use reconciler::{SessionReconciler, SessionState, TITLE_MAX_CHARS};
pub use surface::ChatSurface;

use std::sync::Arc;

use crate::history::ThreadListAdapter;
use crate::llm::gateway::CompletionBackend;
use crate::store::conversations::ConversationRepository;
use crate::store::users::CredentialStore;

/// Shared dependencies handed to the mounted UI-session framework.
///
/// Built once at startup and injected explicitly; nothing here is process
/// global. The framework calls [`SessionRuntime::reconciler`] for each live
/// connection, `credentials` from its login callback, and `history` from its
/// thread list and detail endpoints; only `repository` is also reached from
/// this crate's own HTTP surface (the status ping).
pub struct SessionRuntime {
    pub credentials: Arc<CredentialStore>,
    pub repository: Arc<ConversationRepository>,
    pub history: Arc<ThreadListAdapter>,
    pub backend: Arc<dyn CompletionBackend>,
}

impl SessionRuntime {
    pub fn new(
        credentials: Arc<CredentialStore>,
        repository: Arc<ConversationRepository>,
        history: Arc<ThreadListAdapter>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            credentials,
            repository,
            history,
            backend,
        }
    }

    /// A fresh reconciler for one live session.
    pub fn reconciler(&self) -> SessionReconciler {
        SessionReconciler::new(self.repository.clone(), self.backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::ProviderGateway;
    use crate::store::database::Database;

    #[tokio::test]
    async fn runtime_hands_out_unstarted_reconcilers() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_at(dir.path().join("test.db")).unwrap());
        let repository = Arc::new(ConversationRepository::new(db.clone()));
        let runtime = SessionRuntime::new(
            Arc::new(CredentialStore::new(db)),
            repository.clone(),
            Arc::new(ThreadListAdapter::new(repository)),
            Arc::new(ProviderGateway::new(Config::default())),
        );

        let session = runtime.reconciler();
        assert_eq!(session.state(), SessionState::Unstarted);
        assert!(session.context().is_none());
    }
}
