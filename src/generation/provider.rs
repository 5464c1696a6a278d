//! Provider capability interface.
//!
//! One trait covers every text-generation backend; the concrete client is
//! chosen from configuration at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::Transient;

/// A system/user prompt pair sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Raw text returned by a provider plus token usage when reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("provider request timed out: {0}")]
    Timeout(String),
    #[error("could not reach provider: {0}")]
    Transport(String),
    #[error("provider response was malformed: {0}")]
    InvalidResponse(String),
    #[error("provider is not configured: {0}")]
    NotConfigured(String),
}

const TRANSIENT_HINTS: [&str; 8] = [
    "throttl",
    "rate limit",
    "too many requests",
    "timeout",
    "timed out",
    "temporarily unavailable",
    "overloaded",
    "try again",
];

fn message_is_transient(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_HINTS.iter().any(|hint| lowered.contains(hint))
}

impl ProviderError {
    /// Short category name shown to API clients.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http { status: 401 | 403, .. } => "auth",
            Self::Http { status: 429, .. } => "throttled",
            Self::Http { status, .. } if *status >= 500 => "upstream_unavailable",
            Self::Http { .. } => "bad_request",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "network",
            Self::InvalidResponse(_) => "invalid_response",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http {
                status: 401 | 403, ..
            } => false,
            Self::Http { status, message } => {
                *status == 429 || (500..600).contains(status) || message_is_transient(message)
            }
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::InvalidResponse(message) => message_is_transient(message),
            Self::NotConfigured(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn a non-success HTTP response into a `ProviderError`, keeping the
/// provider's own error message when the body carries one.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    ProviderError::Http { status, message }
}

/// Text-generation backend used for drafting and for the critic pass.
#[async_trait]
pub trait DraftProvider: Send + Sync {
    /// Name used in logs and draft provenance.
    fn name(&self) -> &str;

    /// Produce a draft letter for the prompt.
    async fn generate(&self, prompt: &Prompt) -> Result<Completion, ProviderError>;

    /// Review a draft against the facts. Defaults to a plain completion.
    async fn critic_pass(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        self.generate(prompt).await
    }
}

/// Provider used when no backend is configured; every call fails permanently
/// so callers go straight to the fallback draft.
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DraftProvider for UnavailableProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn generate(&self, _prompt: &Prompt) -> Result<Completion, ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }
}
