use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pokerlog::api::{router, ApiState, HealthState, LatencyStats};
use pokerlog::config::Config;
use pokerlog::db::HandStore;
use pokerlog::error::Result;
use pokerlog::identity::IdentityRegistry;
use pokerlog::state::StatsEngine;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let store = HandStore::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Restore identities, then replay stored hands ---
    let registry = Arc::new(IdentityRegistry::new());
    registry.load(store.load_players().await?);

    let engine = StatsEngine::new(Arc::clone(&registry), cfg.ingest_strict);
    let hands = store.load_hands().await?;
    let report = engine.rebuild(&hands)?;
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "stored hands skipped during replay");
    }
    info!(
        players = registry.len(),
        hands = report.ingested,
        strict = cfg.ingest_strict,
        "Counters rebuilt from store"
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        engine,
        store,
        latency: Arc::new(LatencyStats::new()?),
        health: Arc::new(HealthState::new()),
        merge_threshold: cfg.merge_threshold,
        ingest_lock: Arc::new(Mutex::new(())),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
