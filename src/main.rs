use std::sync::Arc;

use chainledger::api::router::create_router;
use chainledger::config::{AppConfig, LogFormat};
use chainledger::db::{self, PgStore};
use chainledger::scanner::{ChainScanner, ProcessScanner, ProcessScannerConfig};
use chainledger::services::{OrchestratorSettings, Scheduler};
use chainledger::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = chainledger::metrics::init_metrics()?;

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected");

    let store = Arc::new(PgStore::new(pool));
    let scanner = Arc::new(ProcessScanner::new(ProcessScannerConfig::new(
        config.scanner_dir.clone(),
        config.scanner_interpreter.clone(),
        config.scan_timeout,
    )));
    match scanner.check_environment().await {
        Ok(()) => tracing::info!(dir = %config.scanner_dir.display(), "Scanner environment ready"),
        Err(e) => tracing::warn!(error = %e, "Scanner environment unavailable; scans will fail until fixed"),
    }

    let state = AppState::new(
        store.clone(),
        store,
        scanner,
        OrchestratorSettings {
            etherscan_api_key: config.etherscan_api_key.clone(),
        },
    )
    .with_metrics(metrics_handle);

    let scheduler = Scheduler::new(Arc::clone(&state.orchestrator), config.schedule.clone())?;
    if scheduler.initialize() {
        tracing::info!(
            cron = %config.schedule.cron_expression,
            next_run = ?scheduler.next_run(),
            "Scheduler started"
        );
    } else {
        tracing::info!("Automatic scraping disabled (BLOCKCHAIN_AUTO_SCRAPE_ENABLED=false)");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    scheduler.stop();
    Ok(())
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}
