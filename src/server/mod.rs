//! HTTP status surface.
//!
//! Chat interaction goes through the mounted UI-session protocol, not REST;
//! the only documented HTTP route here is the liveness check.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::session::SessionRuntime;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    /// Dependencies for the session protocol mount.
    pub runtime: Arc<SessionRuntime>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    app: String,
    db: &'static str,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let db = match state.runtime.repository.ping().await {
        Ok(()) => "connected",
        Err(_) => "unavailable",
    };

    Json(StatusResponse {
        status: "ok",
        app: state.app_name.clone(),
        db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::history::ThreadListAdapter;
    use crate::llm::ProviderGateway;
    use crate::store::conversations::ConversationRepository;
    use crate::store::database::Database;
    use crate::store::users::CredentialStore;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let db = Arc::new(Database::open_at(dir.path().join("test.db")).unwrap());
        let repository = Arc::new(ConversationRepository::new(db.clone()));
        let runtime = Arc::new(SessionRuntime::new(
            Arc::new(CredentialStore::new(db)),
            repository.clone(),
            Arc::new(ThreadListAdapter::new(repository)),
            Arc::new(ProviderGateway::new(Config::default())),
        ));

        AppState {
            app_name: "parlor".to_string(),
            runtime,
        }
    }

    #[tokio::test]
    async fn status_reports_fixed_health_payload() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let Json(response) = status(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.app, "parlor");
        assert_eq!(response.db, "connected");
    }
}
