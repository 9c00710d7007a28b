//! OpenAI-Compatible Chat Completions Client
//!
//! Implements [`ChatService`] over the `/v1/chat/completions` HTTP API.
//! Works against any endpoint that speaks the same wire format; the base
//! URL is overridable for proxies and compatible providers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, TabletalkError};
use crate::llm::{ChatMessage, ChatService, Completion, Usage};

/// Default per-call HTTP timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// OpenAI-compatible completion client
#[derive(Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(TabletalkError::completion_failed("API key cannot be empty"));
        }

        let http = reqwest::Client::builder().build().map_err(|e| {
            TabletalkError::completion_failed(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            api_key,
            base_url: "https://api.openai.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
            http,
        })
    }

    /// Set a custom base URL for the API
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
                TabletalkError::completion_failed("Invalid API key format")
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(serde::Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl ChatService for OpenAiClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<Completion> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatCompletionRequest { model, messages };

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| TabletalkError::completion_failed(format!("Request failed: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // Prefer the API's own error message when the body parses
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);

            return Err(TabletalkError::completion_failed(format!(
                "API error ({status}): {message}"
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            TabletalkError::completion_failed(format!("Failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TabletalkError::completion_failed("No completion choices returned"))?;

        Ok(Completion {
            content: choice.message.content,
            usage: parsed.usage,
        })
    }
}
