use std::collections::HashSet;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use crate::db::models::{HandRow, PlayerRow};
use crate::error::Result;
use crate::identity::PlayerIdentity;
use crate::types::HandRecord;

/// SQLite persistence for the identity registry and every ingested hand. The stored
/// hands are the source of truth for rebuilding counters after a restart.
#[derive(Clone)]
pub struct HandStore {
    pool: SqlitePool,
}

impl HandStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Which of `ids` are already stored.
    pub async fn known_hand_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut known = HashSet::new();
        for id in ids {
            let hit: Option<i64> = sqlx::query_scalar("SELECT seq FROM hands WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            if hit.is_some() {
                known.insert(id.clone());
            }
        }
        Ok(known)
    }

    /// Persist hands in one transaction. Already-stored ids are left untouched.
    pub async fn save_hands(&self, hands: &[&HandRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_hands(&mut tx, hands).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Persist an ingested batch and the registry as it stands after the batch, in one
    /// transaction. Nothing is written if any statement fails.
    pub async fn save_batch(
        &self,
        hands: &[&HandRecord],
        players: &[PlayerIdentity],
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_hands(&mut tx, hands).await?;
        upsert_players(&mut tx, players).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Every stored hand in ingestion order. Rows that no longer decode are logged and
    /// skipped.
    pub async fn load_hands(&self) -> Result<Vec<HandRecord>> {
        let rows: Vec<HandRow> =
            sqlx::query_as("SELECT seq, id, payload, ingested_at FROM hands ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;

        let mut hands = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<HandRecord>(&row.payload) {
                Ok(hand) => hands.push(hand),
                Err(e) => {
                    warn!(hand_id = %row.id, seq = row.seq, "stored hand does not decode: {e}")
                }
            }
        }
        Ok(hands)
    }

    /// Upsert identities; the alias column always takes the registry's value.
    pub async fn save_players(&self, players: &[PlayerIdentity]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_players(&mut tx, players).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_players(&self) -> Result<Vec<PlayerIdentity>> {
        let rows: Vec<PlayerRow> = sqlx::query_as(
            "SELECT id, original_handle, alias, created_at FROM players ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PlayerIdentity::from).collect())
    }

    /// Remove every hand and identity.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM hands").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM players").execute(&mut *tx).await?;
        tx.commit().await?;
        info!("hand store cleared");
        Ok(())
    }
}

async fn insert_hands(conn: &mut SqliteConnection, hands: &[&HandRecord]) -> Result<u64> {
    let ingested_at = now_ns();
    let mut inserted = 0;
    for hand in hands {
        let payload = serde_json::to_string(hand)?;
        inserted += sqlx::query(
            "INSERT OR IGNORE INTO hands (id, payload, ingested_at) VALUES (?, ?, ?)",
        )
        .bind(&hand.id)
        .bind(payload)
        .bind(ingested_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

async fn upsert_players(conn: &mut SqliteConnection, players: &[PlayerIdentity]) -> Result<()> {
    let created_at = now_ns();
    for p in players {
        sqlx::query(
            r#"
            INSERT INTO players (id, original_handle, alias, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET alias = excluded.alias
            "#,
        )
        .bind(&p.id)
        .bind(&p.original_handle)
        .bind(&p.alias)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
