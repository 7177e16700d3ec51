//! crates/eduverse_core/src/gateway.rs
//!
//! The facade that serves a single user's AI request end to end:
//! quota check, prompt rendering, remote call, reply post-processing.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::warn;

use crate::domain::{CareerRequest, ChatReply, ChatRequest, JobsRequest, Language};
use crate::ports::{CompletionService, PortError, Translator, UserDirectory};
use crate::prompt;
use crate::quota::QuotaTracker;

/// Remaining-quota level at or below which the reply carries a notice.
const LOW_QUOTA_THRESHOLD: i32 = 3;

/// What can stop a request before it reaches the model. Terminal remote
/// failures are deliberately absent: those come back as descriptive text in
/// the normal reply channel, matching what callers have always seen.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("daily usage limit exhausted")]
    QuotaExhausted,
    #[error(transparent)]
    Storage(#[from] PortError),
}

#[derive(Clone)]
pub struct Gateway {
    quota: QuotaTracker,
    users: Arc<dyn UserDirectory>,
    completion: Arc<dyn CompletionService>,
    translator: Option<Arc<dyn Translator>>,
}

impl Gateway {
    pub fn new(
        quota: QuotaTracker,
        users: Arc<dyn UserDirectory>,
        completion: Arc<dyn CompletionService>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Self {
        Self {
            quota,
            users,
            completion,
            translator,
        }
    }

    /// Free-form chat, with an age-appropriate register when the identity
    /// store knows the user's age.
    pub async fn chat(
        &self,
        user_id: Option<i64>,
        request: ChatRequest,
    ) -> Result<ChatReply, GatewayError> {
        self.chat_on(user_id, request, Utc::now().date_naive()).await
    }

    pub async fn career_guidance(
        &self,
        user_id: Option<i64>,
        request: CareerRequest,
    ) -> Result<ChatReply, GatewayError> {
        self.career_guidance_on(user_id, request, Utc::now().date_naive())
            .await
    }

    /// Government-job search. The reply is model-emitted JSON passed through
    /// verbatim; the gateway never parses it.
    pub async fn government_jobs(
        &self,
        user_id: Option<i64>,
        request: JobsRequest,
    ) -> Result<ChatReply, GatewayError> {
        self.government_jobs_on(user_id, request, Utc::now().date_naive())
            .await
    }

    pub(crate) async fn chat_on(
        &self,
        user_id: Option<i64>,
        request: ChatRequest,
        today: NaiveDate,
    ) -> Result<ChatReply, GatewayError> {
        let user_id = self.admit(user_id, today).await?;
        let language = Language::from_tag(request.language.as_deref());

        // Age lookup failures degrade to the default register; the quota has
        // already been charged and the question can still be answered.
        let age = match self.users.user_age(user_id).await {
            Ok(age) => age,
            Err(e) => {
                warn!(user_id, error = %e, "age lookup failed, using default register");
                None
            }
        };

        let prompt = prompt::chat_prompt(&request.message, language, age);
        let mut text = self.complete_as_text(&prompt).await;

        if let Some(target) = request.translate_to.as_deref() {
            text = self.translate_reply(text, language, target).await;
        }

        self.finish(user_id, text, language, today).await
    }

    pub(crate) async fn career_guidance_on(
        &self,
        user_id: Option<i64>,
        request: CareerRequest,
        today: NaiveDate,
    ) -> Result<ChatReply, GatewayError> {
        let user_id = self.admit(user_id, today).await?;
        let language = Language::from_tag(request.language.as_deref());

        let prompt = prompt::career_prompt(
            &request.qualification,
            request.interests.as_deref(),
            request.preferred_field.as_deref(),
            language,
        );
        let text = self.complete_as_text(&prompt).await;

        self.finish(user_id, text, language, today).await
    }

    pub(crate) async fn government_jobs_on(
        &self,
        user_id: Option<i64>,
        request: JobsRequest,
        today: NaiveDate,
    ) -> Result<ChatReply, GatewayError> {
        let user_id = self.admit(user_id, today).await?;

        let prompt = prompt::government_jobs_prompt(&request);
        let text = self.complete_as_text(&prompt).await;

        // The jobs prompt is English-only, so the notice is too.
        self.finish(user_id, text, Language::English, today).await
    }

    /// Steps 1-3 of every request: authentication, quota check, and the
    /// increment, committed before the remote call so usage is charged on
    /// attempt rather than on success.
    async fn admit(&self, user_id: Option<i64>, today: NaiveDate) -> Result<i64, GatewayError> {
        let user_id = user_id.ok_or(GatewayError::Unauthenticated)?;

        if !self.quota.can_proceed(user_id, today).await? {
            return Err(GatewayError::QuotaExhausted);
        }
        self.quota.increment(user_id, today).await?;

        Ok(user_id)
    }

    /// A terminal completion failure becomes its display text; the caller
    /// receives it through the same channel as a real answer.
    async fn complete_as_text(&self, prompt: &str) -> String {
        match self.completion.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "completion failed terminally");
                e.to_string()
            }
        }
    }

    async fn translate_reply(&self, text: String, language: Language, target: &str) -> String {
        let Some(translator) = &self.translator else {
            return text;
        };
        if target == language.code() {
            return text;
        }
        match translator.translate(&text, language.code(), target).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(error = %e, target, "translation failed, returning original reply");
                text
            }
        }
    }

    async fn finish(
        &self,
        user_id: i64,
        mut text: String,
        language: Language,
        today: NaiveDate,
    ) -> Result<ChatReply, GatewayError> {
        let remaining = self.quota.remaining_today(user_id, today).await?;
        if remaining <= LOW_QUOTA_THRESHOLD {
            text.push_str(&prompt::low_quota_notice(remaining, language));
        }
        Ok(ChatReply { text, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{CompletionError, CompletionResult, PortResult, UsageStore};
    use crate::quota::DAILY_LIMIT;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsageStore {
        counts: Mutex<HashMap<(i64, NaiveDate), i32>>,
    }

    impl MemoryUsageStore {
        fn with_count(user_id: i64, date: NaiveDate, count: i32) -> Self {
            let store = Self::default();
            store.counts.lock().unwrap().insert((user_id, date), count);
            store
        }
    }

    #[async_trait]
    impl UsageStore for MemoryUsageStore {
        async fn request_count(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<i32>> {
            Ok(self.counts.lock().unwrap().get(&(user_id, date)).copied())
        }

        async fn increment(&self, user_id: i64, date: NaiveDate) -> PortResult<()> {
            *self
                .counts
                .lock()
                .unwrap()
                .entry((user_id, date))
                .or_insert(0) += 1;
            Ok(())
        }
    }

    struct StubDirectory {
        age: Option<i32>,
    }

    #[async_trait]
    impl UserDirectory for StubDirectory {
        async fn user_exists(&self, _user_id: i64) -> PortResult<bool> {
            Ok(true)
        }

        async fn user_age(&self, _user_id: i64) -> PortResult<Option<i32>> {
            Ok(self.age)
        }
    }

    struct StubCompletion {
        reply: CompletionResult<String>,
    }

    #[async_trait]
    impl CompletionService for StubCompletion {
        async fn complete(&self, _prompt: &str) -> CompletionResult<String> {
            self.reply.clone()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
    }

    fn gateway(store: Arc<MemoryUsageStore>, reply: CompletionResult<String>) -> Gateway {
        Gateway::new(
            QuotaTracker::new(store),
            Arc::new(StubDirectory { age: Some(21) }),
            Arc::new(StubCompletion { reply }),
            None,
        )
    }

    fn chat_request(message: &str, language: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            language: language.map(str::to_string),
            translate_to: None,
        }
    }

    #[tokio::test]
    async fn missing_user_is_unauthenticated() {
        let gw = gateway(Arc::new(MemoryUsageStore::default()), Ok("hi".into()));
        let err = gw
            .chat_on(None, chat_request("hello", None), today())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated));
    }

    #[tokio::test]
    async fn eleventh_request_is_rejected_without_charging() {
        let store = Arc::new(MemoryUsageStore::with_count(7, today(), DAILY_LIMIT));
        let gw = gateway(store.clone(), Ok("hi".into()));

        let err = gw
            .chat_on(Some(7), chat_request("hello", Some("english")), today())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::QuotaExhausted));
        assert_eq!(
            store.request_count(7, today()).await.unwrap(),
            Some(DAILY_LIMIT)
        );
    }

    #[tokio::test]
    async fn quota_is_charged_even_when_the_remote_call_fails() {
        let store = Arc::new(MemoryUsageStore::default());
        let gw = gateway(
            store.clone(),
            Err(CompletionError::Timeout { attempts: 3 }),
        );

        let reply = gw
            .chat_on(Some(7), chat_request("hello", Some("english")), today())
            .await
            .unwrap();
        assert_eq!(
            reply.text,
            "Request timed out after 3 attempts. Please try again."
        );
        assert_eq!(store.request_count(7, today()).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn ninth_request_gets_cleaned_text_and_localized_notice() {
        // User with 8 prior requests today; the client already cleaned the
        // model artifacts out of the reply it hands back.
        let store = Arc::new(MemoryUsageStore::with_count(7, today(), 8));
        let gw = gateway(store, Ok("Answer: it is 42. ".into()));

        let reply = gw
            .chat_on(Some(7), chat_request("what is the answer", Some("english")), today())
            .await
            .unwrap();
        assert_eq!(reply.remaining, 1);
        assert_eq!(
            reply.text,
            "Answer: it is 42. \n\n[You have 1 questions remaining today]"
        );
    }

    #[tokio::test]
    async fn hindi_notice_for_default_language() {
        let store = Arc::new(MemoryUsageStore::with_count(7, today(), 8));
        let gw = gateway(store, Ok("उत्तर".into()));

        let reply = gw
            .chat_on(Some(7), chat_request("सवाल", None), today())
            .await
            .unwrap();
        assert!(reply.text.contains("[आपके पास आज 1 प्रश्न बचे हैं]"));
    }

    #[tokio::test]
    async fn no_notice_while_quota_is_comfortable() {
        let store = Arc::new(MemoryUsageStore::default());
        let gw = gateway(store, Ok("fine".into()));

        let reply = gw
            .chat_on(Some(7), chat_request("q", Some("english")), today())
            .await
            .unwrap();
        assert_eq!(reply.text, "fine");
        assert_eq!(reply.remaining, DAILY_LIMIT - 1);
    }

    #[tokio::test]
    async fn career_flow_counts_against_the_same_quota() {
        let store = Arc::new(MemoryUsageStore::default());
        let gw = gateway(store.clone(), Ok("guide".into()));

        let request = CareerRequest {
            qualification: "BSc Physics".to_string(),
            language: Some("english".to_string()),
            interests: None,
            preferred_field: None,
        };
        let reply = gw.career_guidance_on(Some(7), request, today()).await.unwrap();
        assert_eq!(reply.remaining, DAILY_LIMIT - 1);
        assert_eq!(store.request_count(7, today()).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn jobs_reply_is_passed_through_verbatim() {
        let json = r#"{"jobs":[{"job_title":"Junior Engineer"}]}"#;
        let gw = gateway(Arc::new(MemoryUsageStore::default()), Ok(json.into()));

        let request = JobsRequest {
            qualification: "B.Tech".to_string(),
            field_of_study: "Civil".to_string(),
            age: 23,
            location: "Pune".to_string(),
            job_type: "Full time".to_string(),
        };
        let reply = gw.government_jobs_on(Some(7), request, today()).await.unwrap();
        assert_eq!(reply.text, json);
    }

    #[tokio::test]
    async fn translator_failure_keeps_the_original_reply() {
        struct FailingTranslator;

        #[async_trait]
        impl Translator for FailingTranslator {
            async fn translate(&self, _: &str, _: &str, _: &str) -> PortResult<String> {
                Err(PortError::Unexpected("translation down".to_string()))
            }
        }

        let gw = Gateway::new(
            QuotaTracker::new(Arc::new(MemoryUsageStore::default())),
            Arc::new(StubDirectory { age: None }),
            Arc::new(StubCompletion {
                reply: Ok("hello there".into()),
            }),
            Some(Arc::new(FailingTranslator)),
        );

        let mut request = chat_request("hi", Some("english"));
        request.translate_to = Some("hi".to_string());
        let reply = gw.chat_on(Some(7), request, today()).await.unwrap();
        assert_eq!(reply.text, "hello there");
    }
}
