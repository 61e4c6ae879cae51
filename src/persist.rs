//! Crash-safe progress snapshot.
//!
//! One row per engine instance, rewritten after every mutating event. The
//! snapshot exists so an operator can see the last known progress after a
//! host restart; the loop never resumes mid-send from it.
use crate::model::{CampaignRun, CampaignState};
use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::warn;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, ensure the parent directory exists so a fresh
/// data dir does not fail the first connect. In-memory URLs pass through.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }
    let rest = url["sqlite:".len()..].trim_start_matches("//");
    let path_part = rest.split('?').next().unwrap_or(rest);
    if let Some(parent) = std::path::Path::new(path_part).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    url.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSnapshot {
    pub campaign_id: i64,
    pub state: CampaignState,
    pub sent_count: u32,
    pub failed_count: u32,
    pub total_recipients: u32,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: Pool,
}

impl SnapshotStore {
    pub async fn init(pool: Pool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS campaign_snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                campaign_id INTEGER NOT NULL,
                state TEXT NOT NULL,
                sent_count INTEGER NOT NULL,
                failed_count INTEGER NOT NULL,
                total_recipients INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    pub async fn save(&self, run: &CampaignRun) -> Result<()> {
        sqlx::query(
            "INSERT INTO campaign_snapshot (id, campaign_id, state, sent_count, failed_count, total_recipients, updated_at)
             VALUES (1, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET
                campaign_id = excluded.campaign_id,
                state = excluded.state,
                sent_count = excluded.sent_count,
                failed_count = excluded.failed_count,
                total_recipients = excluded.total_recipients,
                updated_at = excluded.updated_at",
        )
        .bind(run.campaign_id)
        .bind(run.state.as_str())
        .bind(run.sent_count as i64)
        .bind(run.failed_count as i64)
        .bind(run.total_recipients as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<PersistedSnapshot>> {
        let row = sqlx::query(
            "SELECT campaign_id, state, sent_count, failed_count, total_recipients
             FROM campaign_snapshot WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let state: String = row.get("state");
        Ok(Some(PersistedSnapshot {
            campaign_id: row.get("campaign_id"),
            state: CampaignState::parse(&state).unwrap_or(CampaignState::Error),
            sent_count: row.get::<i64, _>("sent_count") as u32,
            failed_count: row.get::<i64, _>("failed_count") as u32,
            total_recipients: row.get::<i64, _>("total_recipients") as u32,
        }))
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM campaign_snapshot WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Durability here is best-effort: a failed write must never stall the
    /// send loop, so errors are logged and swallowed.
    pub async fn save_best_effort(&self, run: &CampaignRun) {
        if let Err(err) = self.save(run).await {
            warn!(?err, campaign_id = run.campaign_id, "snapshot write failed");
        }
    }

    pub async fn clear_best_effort(&self) {
        if let Err(err) = self.clear().await {
            warn!(?err, "snapshot clear failed");
        }
    }
}
