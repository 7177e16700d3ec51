//! crates/eduverse_core/src/history.rs
//!
//! The "one shared generated story per calendar day" lifecycle: lookup,
//! corruption detection, regeneration, and view-count bookkeeping.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::domain::DailyHistory;
use crate::ports::{CompletionService, HistoryStore, PortError, PortResult};
use crate::prompt;

/// The recent window served by `/recent`, in days.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Flags text mangled by an encoding incident. The single-`?` branch makes
/// this deliberately broad: any question mark at all condemns the record, so
/// prompts must steer the model away from producing one.
pub fn is_corrupted(content: &str) -> bool {
    content.contains("???") || content.contains('?')
}

/// Owns the daily history records. Self-healing is unconditional: a record
/// that fails the corruption check is discarded and regenerated rather than
/// ever served, at the cost of one extra remote call.
#[derive(Clone)]
pub struct DailyHistoryService {
    store: Arc<dyn HistoryStore>,
    completion: Arc<dyn CompletionService>,
}

impl DailyHistoryService {
    pub fn new(store: Arc<dyn HistoryStore>, completion: Arc<dyn CompletionService>) -> Self {
        Self { store, completion }
    }

    /// Today's story. Generates and persists it on first call of the day,
    /// counts a view on every later call, and regenerates on corruption.
    pub async fn todays_history(&self) -> PortResult<DailyHistory> {
        self.history_for(Utc::now().date_naive()).await
    }

    /// Delete today's record so the next fetch regenerates it.
    pub async fn clear_today(&self) -> PortResult<()> {
        let today = Utc::now().date_naive();
        self.store.delete_by_date(today).await?;
        info!(date = %today, "cleared today's history for regeneration");
        Ok(())
    }

    /// Administrative force-refresh: drop today's record and build a new one.
    pub async fn regenerate_today(&self) -> PortResult<DailyHistory> {
        self.clear_today().await?;
        self.todays_history().await
    }

    /// Stories from the last [`RECENT_WINDOW_DAYS`] days, newest first.
    pub async fn recent(&self) -> PortResult<Vec<DailyHistory>> {
        self.store.recent_within_days(RECENT_WINDOW_DAYS).await
    }

    pub async fn exists_today(&self) -> PortResult<bool> {
        self.store.exists_for_date(Utc::now().date_naive()).await
    }

    /// Date-parameterized worker behind [`Self::todays_history`].
    pub(crate) async fn history_for(&self, today: NaiveDate) -> PortResult<DailyHistory> {
        if let Some(existing) = self.store.find_by_date(today).await? {
            if is_corrupted(&existing.content) {
                warn!(date = %today, "detected corrupted content, regenerating");
                self.store.delete_by_date(today).await?;
                match self.store.delete_corrupted().await {
                    Ok(swept) if swept > 0 => {
                        warn!(swept, "deleted corrupted history entries");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "corruption sweep failed"),
                }
                return self.generate(today).await;
            }

            let viewed = self.store.increment_view_count(today).await?;
            return match viewed {
                Some(history) => {
                    info!(date = %today, views = history.view_count, "returning existing daily history");
                    Ok(history)
                }
                // Deleted between the read and the bump; start over.
                None => self.generate(today).await,
            };
        }

        self.generate(today).await
    }

    async fn generate(&self, date: NaiveDate) -> PortResult<DailyHistory> {
        info!(date = %date, "generating new daily history");

        let content = match self.completion.complete(&prompt::daily_history_prompt(date)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(date = %date, "model returned blank history, using fallback");
                prompt::default_history_message(date)
            }
            Err(e) => {
                warn!(date = %date, error = %e, "history generation failed, using fallback");
                prompt::default_history_message(date)
            }
        };

        match self.store.insert_new(date, &content).await? {
            Some(history) => Ok(history),
            // Another caller created today's record first; count our view
            // against the winner instead of erroring.
            None => self
                .store
                .increment_view_count(date)
                .await?
                .ok_or_else(|| {
                    PortError::Unexpected(format!("daily history for {} vanished mid-create", date))
                }),
        }
    }
}
