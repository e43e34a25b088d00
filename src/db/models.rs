//! Row types for the tables in `migrations/`.

use crate::identity::PlayerIdentity;

#[derive(Debug, sqlx::FromRow)]
pub struct PlayerRow {
    pub id: String,
    pub original_handle: String,
    pub alias: Option<String>,
    pub created_at: i64,
}

impl From<PlayerRow> for PlayerIdentity {
    fn from(row: PlayerRow) -> Self {
        PlayerIdentity {
            id: row.id,
            original_handle: row.original_handle,
            alias: row.alias,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct HandRow {
    pub seq: i64,
    pub id: String,
    /// JSON-encoded `HandRecord`.
    pub payload: String,
    pub ingested_at: i64,
}
