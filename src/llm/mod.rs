//! Completion Service Types and Trait
//!
//! Chat message/usage types shared by the whole crate, and the
//! [`ChatService`] trait the session talks through. The trait is the seam
//! that keeps the conversation loop testable without a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod client;
pub mod openai;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (fixed, first in history)
    System,
    /// Human turn
    User,
    /// Model turn
    Assistant,
}

/// One message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message sender role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Token usage reported by the completion service
///
/// Informational only: logged after each successful call, never part of
/// the functional core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt-side token count
    pub prompt_tokens: Option<u32>,
    /// Completion-side token count
    pub completion_tokens: Option<u32>,
    /// Total token count
    pub total_tokens: u32,
}

/// A successful completion: assistant text plus usage metadata
#[derive(Debug, Clone)]
pub struct Completion {
    /// Assistant message content (may contain fenced statements)
    pub content: String,
    /// Usage metadata, when the service reports it
    pub usage: Option<Usage>,
}

/// Completion service seam
///
/// One invocation sends the full message history and returns the
/// assistant's reply. Retry policy lives above this trait, in
/// [`client::CompletionClient`].
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Request one completion for the given history
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
    }

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");

        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
