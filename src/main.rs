use std::sync::Arc;

use anyhow::Context;

use mentor_match::api::{AppState, api_routes};
use mentor_match::config::AppConfig;
use mentor_match::llm::create_provider;
use mentor_match::logging;
use mentor_match::matchmaking::{BackgroundRunner, MentorshipService, OrchestratorFactory};
use mentor_match::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = logging::init(&config.log);

    eprintln!("🤝 {} v{}", config.project_name, env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} via {}", config.llm.model, config.llm.base_url);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   API: http://{}/api/v1", config.bind_addr());

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::open(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path))?,
    );

    // ── Matchmaking ──────────────────────────────────────────────────────
    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;
    let factory = Arc::new(OrchestratorFactory::new(llm, config.matching.clone()));
    let runner = BackgroundRunner::new(Arc::clone(&db), factory);
    let service = Arc::new(MentorshipService::new(Arc::clone(&db), runner));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = api_routes(AppState {
        project_name: config.project_name.clone(),
        store: db,
        service,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
