//! Error types for the Pharmesol agent.

use std::time::Duration;

use crate::conversation::ConversationState;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pharmacy directory errors.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Directory connection failed: {0}")]
    Connection(String),

    #[error("Directory returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Directory request failed: {0}")]
    Request(String),

    #[error("Malformed directory payload: {0}")]
    InvalidPayload(String),

    #[error("Directory unreachable after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl DirectoryError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connection(_) | Self::Http { .. } | Self::Request(_)
        )
    }
}

/// Conversation engine errors. These never escape `process_message`; they
/// are logged and the caller receives a reply string regardless.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        from: ConversationState,
        to: ConversationState,
    },
}
