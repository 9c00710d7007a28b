//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout tabletalk.
//! Every fatal failure category gets its own variant so the binary can
//! report it and exit non-zero without stringly-typed matching.
//!
//! # Error Categories
//! - `ConfigError`: settings file or environment resolution errors
//! - `ConnectionFailed`: database connection errors
//! - `IntrospectionFailed`: schema metadata query errors (fatal at startup)
//! - `QueryFailed`: statement execution errors (recoverable at the
//!   statement boundary; fatal only if they escape it)
//! - `CompletionFailed`: completion-service invocation errors
//! - `PromptFailed`: terminal input/output errors

use thiserror::Error;

/// Main error type for tabletalk operations
#[derive(Error, Debug)]
pub enum TabletalkError {
    /// Settings file or environment resolution error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema introspection failed
    #[error("Schema introspection failed: {0}")]
    IntrospectionFailed(String),

    /// Statement execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Completion-service invocation failed
    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    /// Terminal prompt or output failed
    #[error("Prompt failed: {0}")]
    PromptFailed(String),
}

impl TabletalkError {
    /// Get human-readable error message (no credentials or file paths)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create an introspection failed error
    pub fn introspection_failed(message: impl Into<String>) -> Self {
        Self::IntrospectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create a completion failed error
    pub fn completion_failed(message: impl Into<String>) -> Self {
        Self::CompletionFailed(message.into())
    }

    /// Create a prompt failed error
    pub fn prompt_failed(message: impl Into<String>) -> Self {
        Self::PromptFailed(message.into())
    }
}

/// Result type alias for tabletalk operations
pub type Result<T> = std::result::Result<T, TabletalkError>;
