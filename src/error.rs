use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed action sequence in hand {hand_id}: {reason}")]
    MalformedActionSequence { hand_id: String, reason: String },

    #[error("Invalid table size in hand {hand_id}: {seats} occupied seats")]
    InvalidTableSize { hand_id: String, seats: usize },

    #[error("Unknown player: {id}")]
    UnknownPlayer { id: String },

    #[error("Invalid merge threshold {0}: must be in (0, 1]")]
    InvalidThreshold(f64),

    #[error("Snapshot publish error: {0}")]
    SnapshotPublish(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub(crate) fn malformed(hand_id: &str, reason: impl Into<String>) -> Self {
        AppError::MalformedActionSequence {
            hand_id: hand_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedActionSequence { .. } => "malformed_action_sequence",
            AppError::InvalidTableSize { .. } => "invalid_table_size",
            AppError::UnknownPlayer { .. } => "unknown_player",
            AppError::InvalidThreshold(_) => "invalid_threshold",
            AppError::SnapshotPublish(_) => "snapshot_publish",
            AppError::Json(_) => "json",
            AppError::Database(_) => "database",
            AppError::Migration(_) => "migration",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// Errors that only concern a single hand and never abort a lenient batch.
    pub fn is_hand_scoped(&self) -> bool {
        matches!(
            self,
            AppError::MalformedActionSequence { .. } | AppError::InvalidTableSize { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::UnknownPlayer { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidThreshold(_)
            | AppError::MalformedActionSequence { .. }
            | AppError::InvalidTableSize { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "kind": self.kind(), "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
