use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::db::HandStore;
use crate::error::AppError;
use crate::identity::{scan, AliasAssignment, MergeCandidate, PlayerIdentity};
use crate::state::{BatchReport, StatsEngine};
use crate::stats::{player_report, player_reports, PlayerReport};
use crate::types::HandRecord;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<StatsEngine>,
    pub store: HandStore,
    pub latency: Arc<LatencyStats>,
    pub health: Arc<HealthState>,
    pub merge_threshold: f64,
    /// Serializes the dedupe → fold → persist pipeline across requests.
    pub ingest_lock: Arc<Mutex<()>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/hands", post(post_hands))
        .route("/stats", get(get_stats))
        .route("/stats/latency", get(get_stats_latency))
        .route("/player/:id", get(get_player))
        .route("/players", get(get_players))
        .route("/mapping", post(post_mapping))
        .route("/mapping/batch", post(post_mapping_batch))
        .route("/merge/candidates", get(get_merge_candidates))
        .route("/reset", post(post_reset))
        .route("/health", get(get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct MappingRequest {
    pub player_id: String,
    pub alias: String,
}

#[derive(Deserialize)]
pub struct MergeQuery {
    pub threshold: Option<f64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Hands dropped because their id was already stored or repeated in the batch.
    pub duplicates: usize,
    #[serde(flatten)]
    pub report: BatchReport,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PlayerListing {
    pub id: String,
    pub original_name: String,
    pub current_alias: Option<String>,
}

impl From<PlayerIdentity> for PlayerListing {
    fn from(p: PlayerIdentity) -> Self {
        Self {
            id: p.id,
            original_name: p.original_handle,
            current_alias: p.alias,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MappingResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub hands_ingested: u64,
    pub players: usize,
    pub batches: u64,
    pub hands_skipped: u64,
    pub last_batch_at_ns: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn post_hands(
    State(state): State<ApiState>,
    Json(hands): Json<Vec<HandRecord>>,
) -> Result<Json<IngestResponse>, AppError> {
    let started = Instant::now();
    let _pipeline = state.ingest_lock.lock().await;

    let ids: Vec<String> = hands.iter().map(|h| h.id.clone()).collect();
    let mut seen = state.store.known_hand_ids(&ids).await?;
    let fresh: Vec<HandRecord> = hands
        .into_iter()
        .filter(|h| seen.insert(h.id.clone()))
        .collect();
    let duplicates = ids.len() - fresh.len();

    // Counters go live only once the batch and the registry are committed.
    let pending = state.engine.prepare_batch(&fresh)?;
    let ingested: HashSet<&str> = pending
        .report()
        .ingested_ids
        .iter()
        .map(String::as_str)
        .collect();
    let to_store: Vec<&HandRecord> = fresh
        .iter()
        .filter(|h| ingested.contains(h.id.as_str()))
        .collect();
    if let Err(e) = state
        .store
        .save_batch(&to_store, &state.engine.registry().list())
        .await
    {
        warn!(hands = to_store.len(), "batch not stored, discarding counters: {e}");
        return Err(e);
    }
    let report = state.engine.publish_batch(pending)?;

    state.latency.record(started.elapsed());
    state
        .health
        .record_batch(now_ns(), (duplicates + report.skipped.len()) as u64);
    info!(
        ingested = report.ingested,
        skipped = report.skipped.len(),
        duplicates,
        "hand batch stored"
    );

    Ok(Json(IngestResponse { duplicates, report }))
}

async fn get_stats(State(state): State<ApiState>) -> Result<Json<Vec<PlayerReport>>, AppError> {
    let snapshot = state.engine.snapshot()?;
    Ok(Json(player_reports(&snapshot, state.engine.registry())))
}

async fn get_player(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerReport>, AppError> {
    let snapshot = state.engine.snapshot()?;
    Ok(Json(player_report(&snapshot, state.engine.registry(), &id)?))
}

async fn get_players(State(state): State<ApiState>) -> Json<Vec<PlayerListing>> {
    Json(
        state
            .engine
            .registry()
            .list()
            .into_iter()
            .map(PlayerListing::from)
            .collect(),
    )
}

async fn post_mapping(
    State(state): State<ApiState>,
    Json(req): Json<MappingRequest>,
) -> Result<Json<MappingResponse>, AppError> {
    let registry = state.engine.registry();
    registry.set_alias(&req.player_id, &req.alias)?;
    state.store.save_players(&registry.list()).await?;
    Ok(Json(MappingResponse { updated: 1 }))
}

async fn post_mapping_batch(
    State(state): State<ApiState>,
    Json(assignments): Json<Vec<AliasAssignment>>,
) -> Result<Json<MappingResponse>, AppError> {
    let registry = state.engine.registry();
    let updated = registry.set_aliases(&assignments)?;
    state.store.save_players(&registry.list()).await?;
    Ok(Json(MappingResponse { updated }))
}

async fn get_merge_candidates(
    State(state): State<ApiState>,
    Query(params): Query<MergeQuery>,
) -> Result<Json<Vec<MergeCandidate>>, AppError> {
    let threshold = params.threshold.unwrap_or(state.merge_threshold);
    Ok(Json(scan(state.engine.registry(), threshold)?))
}

async fn post_reset(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, AppError> {
    let _pipeline = state.ingest_lock.lock().await;
    state.store.clear().await?;
    state.engine.reset()?;
    state.latency.reset();
    state.health.reset();
    Ok(Json(serde_json::json!({ "status": "reset" })))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let snapshot = state.engine.snapshot()?;
    Ok(Json(HealthResponse {
        status: "ok",
        hands_ingested: snapshot.hands_ingested(),
        players: state.engine.registry().len(),
        batches: state.health.batches(),
        hands_skipped: state.health.hands_skipped(),
        last_batch_at_ns: state.health.last_batch_at_ns(),
    }))
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
