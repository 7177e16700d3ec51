//! crates/eduverse_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::DailyHistory;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Completion Errors
//=========================================================================================

/// Terminal outcome of a completion call after the retry budget is spent.
///
/// The display text of each variant is surfaced to the end caller verbatim,
/// so the wording mirrors what the product has always shown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("Error: {status} (failed after {attempts} attempts)")]
    Http { status: u16, attempts: u32 },
    #[error("Request timed out after {attempts} attempts. Please try again.")]
    Timeout { attempts: u32 },
    #[error("No response from the model after {attempts} attempts.")]
    EmptyResponse { attempts: u32 },
    #[error("Failed to get valid response after {attempts} attempts")]
    NoValidContent { attempts: u32 },
    #[error("Request interrupted")]
    Interrupted,
    #[error("API call failed after {attempts} attempts: {message}")]
    Transport { message: String, attempts: u32 },
}

/// A convenience type alias for `Result<T, CompletionError>`.
pub type CompletionResult<T> = Result<T, CompletionError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for the per-user, per-day request counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Today's count for a user, `None` when the user has not asked anything yet.
    async fn request_count(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<i32>>;

    /// Create-or-increment the counter row. Must be atomic per `(user, date)`:
    /// two concurrent calls may never lose an update.
    async fn increment(&self, user_id: i64, date: NaiveDate) -> PortResult<()>;
}

/// Durable storage for the shared daily history records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn find_by_date(&self, date: NaiveDate) -> PortResult<Option<DailyHistory>>;

    /// Insert a record with `view_count = 1`. Returns `None` when another
    /// caller won the unique-date race, in which case the caller should
    /// re-read instead of erroring.
    async fn insert_new(&self, date: NaiveDate, content: &str) -> PortResult<Option<DailyHistory>>;

    /// Atomically bump the view counter and return the updated record.
    async fn increment_view_count(&self, date: NaiveDate) -> PortResult<Option<DailyHistory>>;

    async fn delete_by_date(&self, date: NaiveDate) -> PortResult<()>;

    /// Delete every record whose content contains a question mark. Returns
    /// how many rows went away.
    async fn delete_corrupted(&self) -> PortResult<u64>;

    /// Records dated within the last `days` days, newest first.
    async fn recent_within_days(&self, days: i64) -> PortResult<Vec<DailyHistory>>;

    async fn exists_for_date(&self, date: NaiveDate) -> PortResult<bool>;
}

/// Read-only view of the identity store. Registration, login, and sessions
/// live outside this service; the gateway only ever asks these two questions.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: i64) -> PortResult<bool>;
    async fn user_age(&self, user_id: i64) -> PortResult<Option<i32>>;
}

/// A client for the remote generative-language API. Implementations own
/// retries, backoff, and reply cleaning; callers see only the final outcome.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> CompletionResult<String>;
}

/// Optional text translation between two language codes.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> PortResult<String>;
}
