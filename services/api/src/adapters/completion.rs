//! services/api/src/adapters/completion.rs
//!
//! This module contains the adapter for the remote chat-completion API.
//! It implements the `CompletionService` port from the `core` crate:
//! build a typed request, send it with bounded retries and linear backoff,
//! then parse and clean the first usable choice.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use eduverse_core::ports::{CompletionError, CompletionResult, CompletionService};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Total attempts per call, including the first one.
const MAX_ATTEMPTS: u32 = 3;

/// Per-attempt HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

//=========================================================================================
// Wire Types
//=========================================================================================

/// A single chat message.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

/// Chat completion response body. Unknown fields are ignored so newer API
/// revisions keep parsing.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

//=========================================================================================
// Attempt Errors and the Retry Driver
//=========================================================================================

/// What one attempt can fail with. The retry loop drives on these values
/// rather than on caught exceptions; the last one is promoted to a terminal
/// [`CompletionError`] once the attempt budget is spent.
#[derive(Debug, Clone)]
enum AttemptError {
    Http(u16),
    Timeout,
    EmptyResponse,
    NoValidContent,
    Transport(String),
    Interrupted,
}

impl AttemptError {
    fn into_terminal(self, attempts: u32) -> CompletionError {
        match self {
            AttemptError::Http(status) => CompletionError::Http { status, attempts },
            AttemptError::Timeout => CompletionError::Timeout { attempts },
            AttemptError::EmptyResponse => CompletionError::EmptyResponse { attempts },
            AttemptError::NoValidContent => CompletionError::NoValidContent { attempts },
            AttemptError::Transport(message) => CompletionError::Transport { message, attempts },
            AttemptError::Interrupted => CompletionError::Interrupted,
        }
    }
}

/// Runs `attempt` up to `max_attempts` times with a linear backoff of
/// `attempt_number * 1s` between tries. An interrupted backoff wait ends the
/// whole call immediately with `Interrupted`.
async fn retry_with_backoff<F, Fut>(
    max_attempts: u32,
    cancel: &CancellationToken,
    mut attempt: F,
) -> CompletionResult<String>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, AttemptError>>,
{
    let mut last = AttemptError::EmptyResponse;

    for number in 1..=max_attempts {
        match attempt(number).await {
            Ok(text) => {
                debug!(attempt = number, "completion call succeeded");
                return Ok(text);
            }
            Err(AttemptError::Interrupted) => return Err(CompletionError::Interrupted),
            Err(e) => {
                warn!(attempt = number, max_attempts, error = ?e, "completion attempt failed");
                last = e;
            }
        }

        if number < max_attempts {
            let backoff = Duration::from_millis(u64::from(number) * 1000);
            tokio::select! {
                _ = cancel.cancelled() => return Err(CompletionError::Interrupted),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    Err(last.into_terminal(max_attempts))
}

//=========================================================================================
// Reply Cleaning
//=========================================================================================

/// Strips numeric footnote markers like `[1]` and unwraps `**bold**`
/// emphasis. Idempotent: cleaning a cleaned string changes nothing.
pub fn clean_reply(text: &str) -> String {
    let footnotes = Regex::new(r"\[\d+\]").unwrap();
    let bold = Regex::new(r"\*\*(.*?)\*\*").unwrap();

    let without_footnotes = footnotes.replace_all(text, "");
    bold.replace_all(&without_footnotes, "$1").into_owned()
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Immutable connection settings for the completion API.
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

/// An adapter that implements the `CompletionService` port against a
/// Perplexity-style chat-completions endpoint. The inner `reqwest::Client`
/// pools connections and is shared across all requests.
#[derive(Clone)]
pub struct PerplexityAdapter {
    client: Client,
    config: CompletionConfig,
    cancel: CancellationToken,
}

impl PerplexityAdapter {
    /// Creates a new `PerplexityAdapter`. The token cancels in-flight backoff
    /// waits, typically on shutdown.
    pub fn new(config: CompletionConfig, cancel: CancellationToken) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            cancel,
        })
    }

    /// One attempt: send, check status, parse, clean.
    async fn attempt_once(&self, prompt: &str, number: u32) -> Result<String, AttemptError> {
        let url = format!("{}/chat/completions", self.config.api_url);
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
        };

        debug!(attempt = number, model = %self.config.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Timeout
                } else {
                    AttemptError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Http(status.as_u16()));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Transport(format!("Failed to parse response: {}", e))
            }
        })?;

        if completion.choices.is_empty() {
            return Err(AttemptError::EmptyResponse);
        }

        // Take the first choice that actually carries text.
        for choice in completion.choices {
            if let Some(content) = choice.message.and_then(|m| m.content) {
                let cleaned = clean_reply(&content);
                if !cleaned.trim().is_empty() {
                    return Ok(cleaned);
                }
            }
        }

        Err(AttemptError::NoValidContent)
    }
}

#[async_trait]
impl CompletionService for PerplexityAdapter {
    async fn complete(&self, prompt: &str) -> CompletionResult<String> {
        retry_with_backoff(MAX_ATTEMPTS, &self.cancel, |number| {
            self.attempt_once(prompt, number)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn cleaning_strips_footnotes_and_bold() {
        assert_eq!(clean_reply("Hello **world** [1][2]"), "Hello world ");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_reply("Start **bold** middle [3] end [12]");
        assert_eq!(clean_reply(&once), once);
    }

    #[test]
    fn cleaning_leaves_plain_text_alone() {
        assert_eq!(clean_reply("no markers here"), "no markers here");
        // Non-numeric brackets are not footnotes.
        assert_eq!(clean_reply("[citation needed]"), "[citation needed]");
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_linear_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();

        let counter = calls.clone();
        let result = retry_with_backoff(MAX_ATTEMPTS, &cancel, move |_| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(AttemptError::Http(500))
                } else {
                    Ok("third time lucky".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "third time lucky");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Backoff windows were 1s then 2s.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_attempt_count() {
        let cancel = CancellationToken::new();
        let result = retry_with_backoff(MAX_ATTEMPTS, &cancel, |_| async {
            Err::<String, _>(AttemptError::Http(503))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Http {
                status: 503,
                attempts: 3
            }
        );
        assert!(err.to_string().contains("failed after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_responses_are_retried_then_terminal() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let counter = calls.clone();
        let result = retry_with_backoff(MAX_ATTEMPTS, &cancel, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(AttemptError::EmptyResponse)
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.unwrap_err(),
            CompletionError::EmptyResponse { attempts: 3 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_backoff_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = tokio::time::Instant::now();

        let result = retry_with_backoff(MAX_ATTEMPTS, &cancel, |_| async {
            Err::<String, _>(AttemptError::Timeout)
        })
        .await;

        assert_eq!(result.unwrap_err(), CompletionError::Interrupted);
        // No backoff was slept through.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn interrupted_attempt_is_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let counter = calls.clone();
        let result = retry_with_backoff(MAX_ATTEMPTS, &cancel, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(AttemptError::Interrupted)
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), CompletionError::Interrupted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn response_parsing_ignores_unknown_fields() {
        let body = r#"{
            "id": "abc",
            "object": "chat.completion",
            "created": 1700000000,
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3},
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0]
                .message
                .as_ref()
                .and_then(|m| m.content.as_deref()),
            Some("hi")
        );
    }

    #[test]
    fn missing_choices_parse_as_empty() {
        let parsed: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}
