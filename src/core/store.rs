// src/core/store.rs

//! SQLite-backed persistence of scan records.
//!
//! The store owns every persisted `ScanRecord`. There is exactly one row per
//! normalized URL; rescans overwrite it in place and keep its row identity.

use crate::core::error::{Result, ScanError};
use crate::core::models::{AggregateScores, ProbeEntry, ScanRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "SELECT url, probes, score_normal, score_privacy, score_security, \
     score_random, score_adversarial, duration, timestamp FROM scan_records";

#[derive(Debug, Clone)]
pub struct ResultStore {
    pool: Pool<Sqlite>,
}

impl ResultStore {
    /// Opens (creating if needed) the database file at `path` and applies the
    /// embedded migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScanError::Store(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "Result store opened");
        Self::with_pool(pool).await
    }

    /// A private, process-local store. A single connection that never idles
    /// out keeps the in-memory database alive for the life of the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        debug!("In-memory result store opened");
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ScanError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }

    // --- Operations ---

    /// Inserts or overwrites the record for `url`, stamping it with the
    /// current instant.
    pub async fn upsert(
        &self,
        url: &str,
        probes: &[ProbeEntry],
        scores: AggregateScores,
        duration: f64,
    ) -> Result<()> {
        let probes_json = serde_json::to_string(probes)?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            "INSERT INTO scan_records (url, probes, score_normal, score_privacy, score_security, \
             score_random, score_adversarial, duration, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(url) DO UPDATE SET \
             probes = excluded.probes, \
             score_normal = excluded.score_normal, \
             score_privacy = excluded.score_privacy, \
             score_security = excluded.score_security, \
             score_random = excluded.score_random, \
             score_adversarial = excluded.score_adversarial, \
             duration = excluded.duration, \
             timestamp = excluded.timestamp",
        )
        .bind(url)
        .bind(&probes_json)
        .bind(i64::from(scores.normal))
        .bind(i64::from(scores.privacy))
        .bind(i64::from(scores.security))
        .bind(i64::from(scores.random))
        .bind(i64::from(scores.adversarial))
        .bind(duration)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        debug!(url, %timestamp, "Scan record upserted");
        Ok(())
    }

    pub async fn get(&self, url: &str) -> Result<Option<ScanRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE url = ?"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Every stored record, most recently written first.
    pub async fn list_all(&self) -> Result<Vec<ScanRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Deletes every record and returns how many were removed.
    pub async fn clear(&self) -> Result<u64> {
        let done = sqlx::query("DELETE FROM scan_records")
            .execute(&self.pool)
            .await?;
        info!(removed = done.rows_affected(), "Result store cleared");
        Ok(done.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scan_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// --- Row Decoding ---

fn record_from_row(row: &SqliteRow) -> Result<ScanRecord> {
    let probes_json: String = row.try_get("probes")?;
    let probes: Vec<ProbeEntry> = serde_json::from_str(&probes_json)?;

    let timestamp_raw: String = row.try_get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map_err(|e| ScanError::Decode(format!("timestamp '{timestamp_raw}': {e}")))?
        .with_timezone(&Utc);

    Ok(ScanRecord {
        url: row.try_get("url")?,
        probes,
        scores: AggregateScores {
            normal: score_column(row, "score_normal")?,
            privacy: score_column(row, "score_privacy")?,
            security: score_column(row, "score_security")?,
            random: score_column(row, "score_random")?,
            adversarial: score_column(row, "score_adversarial")?,
        },
        duration: row.try_get("duration")?,
        timestamp,
    })
}

fn score_column(row: &SqliteRow, column: &str) -> Result<u8> {
    let value: i64 = row.try_get(column)?;
    u8::try_from(value).map_err(|_| ScanError::Decode(format!("{column} out of range: {value}")))
}
