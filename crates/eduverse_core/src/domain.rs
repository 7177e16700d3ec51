//! crates/eduverse_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};

/// The language a reply should be rendered in.
///
/// The recognized tag is the literal `"english"` (case-insensitive). Every
/// other value, including a missing one, selects Hindi. Defaulting to Hindi
/// is intentional product behavior, not a fallback of last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Hindi,
}

impl Language {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.eq_ignore_ascii_case("english") => Language::English,
            _ => Language::Hindi,
        }
    }

    /// Two-letter code used by the translation helper.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }
}

/// One shared generated story per calendar date.
#[derive(Debug, Clone)]
pub struct DailyHistory {
    pub id: i64,
    pub history_date: NaiveDate,
    pub content: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-user, per-day request bookkeeping. Never deleted.
#[derive(Debug, Clone)]
pub struct UsageCounter {
    pub user_id: i64,
    pub usage_date: NaiveDate,
    pub request_count: i32,
}

/// A free-form question from a user.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub language: Option<String>,
    /// Optional target language code for the translation helper.
    pub translate_to: Option<String>,
}

/// Profile fields for a career-guidance request.
#[derive(Debug, Clone)]
pub struct CareerRequest {
    pub qualification: String,
    pub language: Option<String>,
    pub interests: Option<String>,
    pub preferred_field: Option<String>,
}

/// Profile fields for a government-job search.
#[derive(Debug, Clone)]
pub struct JobsRequest {
    pub qualification: String,
    pub field_of_study: String,
    pub age: i32,
    pub location: String,
    pub job_type: String,
}

/// What the gateway hands back for an accepted request.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub remaining: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_tag_is_case_insensitive() {
        assert_eq!(Language::from_tag(Some("English")), Language::English);
        assert_eq!(Language::from_tag(Some("ENGLISH")), Language::English);
    }

    #[test]
    fn everything_else_selects_hindi() {
        assert_eq!(Language::from_tag(None), Language::Hindi);
        assert_eq!(Language::from_tag(Some("hindi")), Language::Hindi);
        assert_eq!(Language::from_tag(Some("en")), Language::Hindi);
        assert_eq!(Language::from_tag(Some("")), Language::Hindi);
    }
}
