use crate::error::{AppError, Result};

/// Smallest table the position table covers (heads-up).
pub const MIN_TABLE_SIZE: usize = 2;

/// Largest table the position table covers (full ring).
pub const MAX_TABLE_SIZE: usize = 9;

/// Hex characters of the SHA-256 digest kept as a player id (64 bits).
pub const PLAYER_ID_HEX_LEN: usize = 16;

/// Default similarity threshold for merge scans when the caller gives none.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.8;

/// Percentages are reported with this many decimals.
pub const STAT_DECIMALS: i32 = 1;

/// Aggression factor is reported with this many decimals.
pub const AF_DECIMALS: i32 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Threshold used by `/merge/candidates` when no `threshold` query is given (MERGE_THRESHOLD)
    pub merge_threshold: f64,
    /// Abort a whole batch on the first malformed hand instead of skipping it (INGEST_STRICT)
    pub ingest_strict: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let merge_threshold = std::env::var("MERGE_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_MERGE_THRESHOLD.to_string())
            .parse::<f64>()
            .map_err(|_| AppError::Config("MERGE_THRESHOLD must be a number".to_string()))?;
        if !(merge_threshold > 0.0 && merge_threshold <= 1.0) {
            return Err(AppError::Config(
                "MERGE_THRESHOLD must be in (0, 1]".to_string(),
            ));
        }

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "pokerlog.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            merge_threshold,
            ingest_strict: std::env::var("INGEST_STRICT")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        })
    }
}
