use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod history;
mod llm;
mod server;
mod session;
mod store;

use config::Config;
use history::ThreadListAdapter;
use llm::gateway::CompletionBackend;
use llm::{Provider, ProviderGateway};
use server::{build_router, AppState};
use session::SessionRuntime;
use store::conversations::ConversationRepository;
use store::database::Database;
use store::users::CredentialStore;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file; its absence is fine.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("no .env file loaded: {}", e);
    }

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parlor=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

async fn run() -> Result<()> {
    let config = Config::init()?;

    let db = Arc::new(Database::open_at(&config.database_path)?);
    let credentials = Arc::new(CredentialStore::new(db.clone()));
    let repository = Arc::new(ConversationRepository::new(db));
    let history = Arc::new(ThreadListAdapter::new(repository.clone()));
    let gateway: Arc<dyn CompletionBackend> = Arc::new(ProviderGateway::new(config.clone()));

    let local_models = gateway.list_models(Provider::Ollama).await;
    info!(models = ?local_models, "local models available");

    let runtime = Arc::new(SessionRuntime::new(
        credentials,
        repository,
        history,
        gateway,
    ));

    let state = AppState {
        app_name: config.app_name.clone(),
        runtime,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
