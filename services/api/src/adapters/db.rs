//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the storage ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use eduverse_core::domain::DailyHistory;
use eduverse_core::ports::{HistoryStore, PortError, PortResult, UsageStore, UserDirectory};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter backing the `UsageStore`, `HistoryStore`, and
/// `UserDirectory` ports with one shared connection pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DailyHistoryRecord {
    id: i64,
    history_date: NaiveDate,
    content: String,
    view_count: i64,
    created_at: DateTime<Utc>,
}

impl DailyHistoryRecord {
    fn to_domain(self) -> DailyHistory {
        DailyHistory {
            id: self.id,
            history_date: self.history_date,
            content: self.content,
            view_count: self.view_count,
            created_at: self.created_at,
        }
    }
}

const HISTORY_COLUMNS: &str = "id, history_date, content, view_count, created_at";

//=========================================================================================
// `UsageStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UsageStore for DbAdapter {
    async fn request_count(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<i32>> {
        sqlx::query_scalar(
            "SELECT request_count FROM usage_counters WHERE user_id = $1 AND usage_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn increment(&self, user_id: i64, date: NaiveDate) -> PortResult<()> {
        // One atomic upsert; concurrent increments serialize on the row.
        sqlx::query(
            "INSERT INTO usage_counters (user_id, usage_date, request_count) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, usage_date) \
             DO UPDATE SET request_count = usage_counters.request_count + 1",
        )
        .bind(user_id)
        .bind(date)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `HistoryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HistoryStore for DbAdapter {
    async fn find_by_date(&self, date: NaiveDate) -> PortResult<Option<DailyHistory>> {
        let record = sqlx::query_as::<_, DailyHistoryRecord>(&format!(
            "SELECT {} FROM daily_content WHERE history_date = $1",
            HISTORY_COLUMNS
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(DailyHistoryRecord::to_domain))
    }

    async fn insert_new(&self, date: NaiveDate, content: &str) -> PortResult<Option<DailyHistory>> {
        // DO NOTHING + RETURNING yields no row when another caller won the
        // unique-date race; the service re-reads in that case.
        let record = sqlx::query_as::<_, DailyHistoryRecord>(&format!(
            "INSERT INTO daily_content (history_date, content, view_count) VALUES ($1, $2, 1) \
             ON CONFLICT (history_date) DO NOTHING \
             RETURNING {}",
            HISTORY_COLUMNS
        ))
        .bind(date)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(DailyHistoryRecord::to_domain))
    }

    async fn increment_view_count(&self, date: NaiveDate) -> PortResult<Option<DailyHistory>> {
        let record = sqlx::query_as::<_, DailyHistoryRecord>(&format!(
            "UPDATE daily_content SET view_count = view_count + 1 \
             WHERE history_date = $1 \
             RETURNING {}",
            HISTORY_COLUMNS
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(DailyHistoryRecord::to_domain))
    }

    async fn delete_by_date(&self, date: NaiveDate) -> PortResult<()> {
        sqlx::query("DELETE FROM daily_content WHERE history_date = $1")
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_corrupted(&self) -> PortResult<u64> {
        // '?' is a literal inside LIKE, so this matches any content holding
        // at least one question mark.
        let result = sqlx::query("DELETE FROM daily_content WHERE content LIKE '%?%'")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn recent_within_days(&self, days: i64) -> PortResult<Vec<DailyHistory>> {
        let cutoff = Utc::now().date_naive() - Duration::days(days);
        let records = sqlx::query_as::<_, DailyHistoryRecord>(&format!(
            "SELECT {} FROM daily_content WHERE history_date >= $1 ORDER BY history_date DESC",
            HISTORY_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(DailyHistoryRecord::to_domain).collect())
    }

    async fn exists_for_date(&self, date: NaiveDate) -> PortResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM daily_content WHERE history_date = $1)")
            .bind(date)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//=========================================================================================
// `UserDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectory for DbAdapter {
    async fn user_exists(&self, user_id: i64) -> PortResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn user_age(&self, user_id: i64) -> PortResult<Option<i32>> {
        sqlx::query_scalar("SELECT age FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)
    }
}
