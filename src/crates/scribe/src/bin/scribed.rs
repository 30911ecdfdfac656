//! scribed - workflow orchestration service for vault article drafts.
//!
//! Loads settings from the environment (with CLI overrides), opens the
//! database, wires the graph catalog to the configured external clients,
//! spawns the async worker, and serves the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use clients::{
    DraftBranchClient, DraftGatewayClient, LlmClient, MockDraftClient, MockLlmClient,
    MockResearchClient, OllamaClient, ResearchApiClient, ResearchClient,
};
use scribe::api::{create_router, AppState};
use scribe::vault::FsVaultService;
use scribe::{
    Database, Dispatcher, GraphCatalog, PipelineRunner, Settings, TaskQueue, Worker,
    WorkflowRegistry,
};

#[derive(Parser)]
#[command(name = "scribed")]
#[command(about = "Workflow orchestration service for vault article drafts", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long)]
    bind: Option<String>,

    /// Path to the SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to the local vault checkout
    #[arg(long)]
    vault: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("failed to load settings")?;
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        settings.database_path = database;
    }
    if let Some(vault) = cli.vault {
        settings.vault_path = Some(vault);
    }

    let db = Arc::new(
        Database::initialize(&settings.database_path)
            .await
            .context("failed to open database")?,
    );
    let registry = WorkflowRegistry::new(db.clone());

    let llm: Arc<dyn LlmClient> = if settings.llm.use_mock {
        info!("Using mock LLM client");
        Arc::new(MockLlmClient::new())
    } else {
        Arc::new(OllamaClient::new(
            &settings.llm.base_url,
            &settings.llm.model,
            settings.llm.timeout,
        )?)
    };
    let research: Arc<dyn ResearchClient> = if settings.research.use_mock {
        info!("Using mock research client");
        Arc::new(MockResearchClient::new())
    } else {
        Arc::new(ResearchApiClient::new(
            &settings.research.base_url,
            settings.research.timeout,
        )?)
    };
    let draft: Arc<dyn DraftBranchClient> = if settings.draft.use_mock {
        info!("Using mock draft gateway client");
        Arc::new(MockDraftClient::new())
    } else {
        Arc::new(DraftGatewayClient::new(
            &settings.draft.base_url,
            settings.draft.timeout,
        )?)
    };

    let catalog = Arc::new(GraphCatalog::with_article_proposal(llm, research, draft));
    let vault = Arc::new(FsVaultService::new(settings.vault_path.clone()));
    let runner = Arc::new(PipelineRunner::new(
        registry.clone(),
        catalog.clone(),
        vault,
        settings.task_time_limit,
        settings.task_soft_time_limit,
    ));

    let (queue, rx) = TaskQueue::bounded(settings.queue_capacity);
    Worker::new(registry.clone(), runner.clone()).spawn(rx);

    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        catalog,
        queue,
        runner,
    ));

    let app = create_router(AppState {
        dispatcher,
        registry,
        db,
        max_page_size: settings.api_max_page_size,
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "scribed listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
