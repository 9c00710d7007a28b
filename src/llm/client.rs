//! Bounded-Retry Completion Client
//!
//! Wraps a [`ChatService`] with an explicit attempt counter and a tagged
//! outcome. Exhausting the retry budget is a terminal state the caller
//! must handle as fatal; the client itself never loops forever and never
//! sleeps between attempts.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::llm::{ChatMessage, ChatService, Completion};

/// Total attempts per completion, counting the first one
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Result of a completion request after retry handling
#[derive(Debug)]
pub enum CompletionOutcome {
    /// An attempt succeeded
    Success(Completion),
    /// Every attempt failed; fatal at the session boundary
    ExhaustedRetries {
        /// How many attempts were made
        attempts: u32,
        /// Message of the last failure
        last_error: String,
    },
}

/// Completion client: a chat service plus model and retry budget
pub struct CompletionClient {
    service: Arc<dyn ChatService>,
    model: String,
    max_retries: u32,
}

impl CompletionClient {
    /// Create a client with the default retry budget
    pub fn new(service: Arc<dyn ChatService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the total attempt budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Request a completion for the full message history
    ///
    /// Retries immediately on any invocation error, up to the attempt
    /// budget. Each failure and the retry decision is logged.
    pub async fn complete(&self, messages: &[ChatMessage]) -> CompletionOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            let started = Instant::now();

            match self.service.complete(&self.model, messages).await {
                Ok(completion) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    info!(attempt, elapsed_ms, "completion received");
                    if let Some(usage) = &completion.usage {
                        info!(
                            prompt_tokens = ?usage.prompt_tokens,
                            completion_tokens = ?usage.completion_tokens,
                            total_tokens = usage.total_tokens,
                            "completion usage"
                        );
                    }
                    return CompletionOutcome::Success(completion);
                }
                Err(e) => {
                    last_error = e.message();
                    if attempt < self.max_retries {
                        warn!(attempt, max = self.max_retries, error = %last_error, "completion attempt failed, retrying");
                    } else {
                        warn!(attempt, max = self.max_retries, error = %last_error, "completion attempt failed, giving up");
                    }
                }
            }
        }

        CompletionOutcome::ExhaustedRetries {
            attempts: self.max_retries,
            last_error,
        }
    }
}
