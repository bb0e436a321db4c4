//! Language-model interaction with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait, one structured prompt in, raw model text out
//! - [`GeminiClient`]: Talks to the Gemini `generateContent` endpoint
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff from a configurable base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::ServiceError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

const SERVICE: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One structured-extraction request: the full prompt text and the schema
/// the answer must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPrompt {
    pub text: String,
    pub schema: Value,
}

/// Trait for async LLM interaction.
///
/// Implementors send a [`StructuredPrompt`] to a model and return the text of
/// its answer, untouched. Validation of that text is the caller's job.
pub trait AskAsync {
    async fn ask(&self, prompt: &StructuredPrompt) -> Result<String, ServiceError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &StructuredPrompt) -> Result<String, ServiceError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => {
                    info!(
                        attempts = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                        "ask() succeeded"
                    );
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() {
                        error!(
                            attempt,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() failed with a permanent error; not retrying"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Safety categories relaxed for extraction requests.
///
/// Casualty and destruction reporting routinely trips the default thresholds,
/// so these are raised to block only high-probability harm. Nothing else
/// about the request is changed.
const RELAXED_SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const RELAXED_SAFETY_THRESHOLD: &str = "BLOCK_ONLY_HIGH";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
    client: reqwest::Client,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        temperature: f32,
        timeout: StdDuration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model,
            temperature,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    fn build_request<'a>(&self, prompt: &'a StructuredPrompt) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt.text }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &prompt.schema,
                temperature: self.temperature,
            },
            safety_settings: RELAXED_SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: RELAXED_SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &StructuredPrompt) -> Result<String, ServiceError> {
        let t0 = Instant::now();
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let dt = t0.elapsed();
        if !status.is_success() {
            warn!(elapsed_ms = dt.as_millis() as u128, %status, "API call failed");
            return Err(ServiceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let finish_reason = parsed
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone());
        if let Some(feedback) = &parsed.prompt_feedback {
            warn!(%feedback, "Prompt feedback returned by model");
        }
        match parsed.into_text() {
            Some(text) => {
                info!(
                    elapsed_ms = dt.as_millis() as u128,
                    bytes = text.len(),
                    finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                    "Model answered"
                );
                Ok(text)
            }
            None => {
                warn!(
                    finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                    "Model returned no text"
                );
                Err(ServiceError::EmptyResponse(SERVICE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyModel {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for FlakyModel {
        async fn ask(&self, _prompt: &StructuredPrompt) -> Result<String, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(ServiceError::EmptyResponse("flaky"))
            } else {
                Ok("[]".to_string())
            }
        }
    }

    fn prompt() -> StructuredPrompt {
        StructuredPrompt {
            text: "trích xuất".to_string(),
            schema: serde_json::json!({"type": "ARRAY"}),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let retry = RetryAsk::new(
            FlakyModel {
                failures_before_success: 2,
                calls: AtomicUsize::new(0),
            },
            3,
            StdDuration::from_millis(1),
        );
        assert_eq!(retry.ask(&prompt()).await.unwrap(), "[]");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let retry = RetryAsk::new(
            FlakyModel {
                failures_before_success: 10,
                calls: AtomicUsize::new(0),
            },
            1,
            StdDuration::from_millis(1),
        );
        assert!(retry.ask(&prompt()).await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 2);
    }

    struct RejectingModel {
        calls: AtomicUsize,
    }

    impl AskAsync for RejectingModel {
        async fn ask(&self, _prompt: &StructuredPrompt) -> Result<String, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Status {
                service: "gemini",
                status: 401,
                body: "API key not valid".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let retry = RetryAsk::new(
            RejectingModel {
                calls: AtomicUsize::new(0),
            },
            3,
            StdDuration::from_secs(5),
        );
        let err = retry.ask(&prompt()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 401, .. }));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_request_carries_schema_and_relaxed_safety() {
        let client = GeminiClient::new(
            "key".to_string(),
            "gemini-2.5-flash".to_string(),
            0.1,
            StdDuration::from_secs(5),
        )
        .unwrap();
        let prompt = prompt();
        let json = serde_json::to_value(client.build_request(&prompt)).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "trích xuất");
        let safety = json["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_ONLY_HIGH"));
    }

    #[test]
    fn test_response_text_extraction() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "[{\"id\""}, {"text": ": 0}]"}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some(r#"[{"id": 0}]"#));

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(blocked.into_text().is_none());
    }
}
