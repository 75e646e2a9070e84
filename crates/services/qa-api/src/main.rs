use anyhow::Context;
use clap::Parser;
use qa_api::config::{ApiConfig, PrefsBackend, StorageBackend};
use qa_api::metrics::{setup_metrics_recorder, spawn_metrics_exporter};
use qa_api::store::{
    create_pg_pool, DocumentStore, HttpPrefsStore, InMemoryDocumentStore, InMemoryPrefsStore,
    PostgresDocumentStore, PostgresPrefsStore, PrefsStore,
};
use qa_api::{create_app, AppState};
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "qa-api", about = "Q&A forum API server", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = ApiConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(metrics_addr) = config.metrics_addr {
        let handle = setup_metrics_recorder().context("failed to install metrics recorder")?;
        spawn_metrics_exporter(handle, metrics_addr);
    }

    let pool = connect_if_needed(&config).await?;

    let documents: Arc<dyn DocumentStore> = match (config.storage.backend, &pool) {
        (StorageBackend::Postgres, Some(pool)) => Arc::new(PostgresDocumentStore::new(pool.clone())),
        _ => Arc::new(InMemoryDocumentStore::new()),
    };
    let prefs: Arc<dyn PrefsStore> = match config.prefs.backend {
        PrefsBackend::Http => {
            let base_url = config
                .prefs
                .base_url
                .as_deref()
                .context("prefs.base_url is required for the http backend")?;
            tracing::info!("Using remote preference service at {}", base_url);
            Arc::new(HttpPrefsStore::new(
                base_url,
                config.prefs.api_key.clone(),
                config.prefs.timeout(),
            )?)
        }
        PrefsBackend::Postgres => match &pool {
            Some(pool) => Arc::new(PostgresPrefsStore::new(pool.clone())),
            None => anyhow::bail!("postgres prefs backend configured without a database"),
        },
        PrefsBackend::Memory => Arc::new(InMemoryPrefsStore::new()),
    };
    tracing::info!(
        storage = ?config.storage.backend,
        prefs = ?config.prefs.backend,
        "stores initialised"
    );

    let app = create_app(AppState::new(
        documents,
        prefs,
        config.reputation.max_attempts,
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!("listening on {}", config.listen_addr);
    tracing::info!("Swagger UI available at http://{}/docs", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn connect_if_needed(config: &ApiConfig) -> anyhow::Result<Option<PgPool>> {
    let needed = config.storage.backend == StorageBackend::Postgres
        || config.prefs.backend == PrefsBackend::Postgres;
    if !needed {
        return Ok(None);
    }
    let url = config
        .storage
        .database_url
        .as_deref()
        .context("storage.database_url is required for the postgres backend")?;
    let pool = create_pg_pool(url, config.storage.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    Ok(Some(pool))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
