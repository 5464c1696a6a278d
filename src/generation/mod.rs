//! Draft generation adapter.
//!
//! Turns case facts into a draft letter: prompt, provider call under the
//! retry policy, response parsing, placeholder accounting and the critic
//! pass. Anything that keeps a usable provider draft from coming back ends
//! in the deterministic fallback letter instead of an error.

pub mod anthropic;
pub mod fallback;
pub mod openai;
pub mod parser;
pub mod placeholder;
pub mod prompt;
pub mod provider;
pub mod retry;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::config::{LlmConfig, ProviderKind};
use crate::facts::Facts;

use self::anthropic::AnthropicProvider;
use self::openai::OpenAiProvider;
use self::parser::{MarkerResponseParser, ParsedDraft, ResponseParser};
use self::provider::{Completion, DraftProvider, UnavailableProvider};
use self::retry::{retry_with_backoff, RetryError, RetryPolicy, RetryReport};

pub const FALLBACK_ISSUE: &str = "fallback template used; draft was not AI-generated";
pub const UNPARSEABLE_ISSUE: &str = "provider response could not be parsed";

/// Optional presentation hints, from a template or the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StyleHints {
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub letterhead: Option<String>,
    /// Governing jurisdiction; taken from the template, never from the request.
    #[serde(skip)]
    pub jurisdiction: Option<String>,
}

impl StyleHints {
    /// Fill unset hints from `other`; values already set here win.
    pub fn or(self, other: Option<&StyleHints>) -> StyleHints {
        match other {
            Some(other) => StyleHints {
                tone: self.tone.or_else(|| other.tone.clone()),
                letterhead: self.letterhead.or_else(|| other.letterhead.clone()),
                jurisdiction: self.jurisdiction.or_else(|| other.jurisdiction.clone()),
            },
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tone.is_none() && self.letterhead.is_none() && self.jurisdiction.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    Provider,
    Fallback,
}

impl GenerationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CriticStatus {
    /// Disabled, or the draft came from the fallback template.
    Skipped,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerationResult {
    pub draft_markdown: String,
    pub issues: Vec<String>,
    pub explanations: BTreeMap<String, String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub source: GenerationSource,
    /// Name of the provider that was asked, even when the fallback was used.
    pub provider: String,
    /// Drafting calls made, including the successful one.
    pub attempts: u32,
    /// Backoff slept between drafting calls, in milliseconds.
    pub backoff_ms: Vec<u64>,
    pub critic: CriticStatus,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

fn add_tokens(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}

pub struct DraftGenerator {
    provider: Arc<dyn DraftProvider>,
    parser: Arc<dyn ResponseParser>,
    policy: RetryPolicy,
    critic_enabled: bool,
}

impl DraftGenerator {
    pub fn new(provider: Arc<dyn DraftProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            parser: Arc::new(MarkerResponseParser),
            policy,
            critic_enabled: true,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_critic(mut self, enabled: bool) -> Self {
        self.critic_enabled = enabled;
        self
    }

    pub fn from_config(config: &LlmConfig, client: reqwest::Client) -> Self {
        Self::new(build_provider(config, client), config.retry_policy())
            .with_critic(config.critic_enabled)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate(
        &self,
        facts: &Facts,
        template: Option<&str>,
        style: Option<&StyleHints>,
    ) -> Result<GenerationResult, GenerationError> {
        self.generate_with_cancel(facts, template, style, &CancellationToken::new())
            .await
    }

    /// Generate a draft, aborting (including mid-backoff) when `cancel` fires.
    pub async fn generate_with_cancel(
        &self,
        facts: &Facts,
        template: Option<&str>,
        style: Option<&StyleHints>,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = prompt::build_draft_prompt(facts, template, style);
        log::info!(
            "requesting draft from provider '{}' (up to {} attempt(s))",
            self.provider.name(),
            self.policy.max_attempts()
        );

        let outcome = retry_with_backoff(&self.policy, cancel, |attempt| {
            log::debug!("draft attempt {}", attempt + 1);
            self.provider.generate(&prompt)
        })
        .await;

        let (completion, report) = match outcome {
            Ok(ok) => ok,
            Err(RetryError::Cancelled { report }) => {
                log::info!("generation cancelled after {} attempt(s)", report.attempts);
                return Err(GenerationError::Cancelled {
                    attempts: report.attempts,
                });
            }
            Err(RetryError::Exhausted { last, report }) => {
                let reason = format!(
                    "provider unavailable ({}): {} (after {} attempt(s))",
                    last.category(),
                    last,
                    report.attempts
                );
                return Ok(self.fallback(facts, reason, report, None));
            }
            Err(RetryError::Permanent { error, report }) => {
                let reason = format!("provider unavailable ({}): {}", error.category(), error);
                return Ok(self.fallback(facts, reason, report, None));
            }
        };

        let parsed = match self.parser.parse_draft(&completion.text) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("{}; substituting fallback draft", e);
                return Ok(self.fallback(
                    facts,
                    UNPARSEABLE_ISSUE.to_string(),
                    report,
                    Some(&completion),
                ));
            }
        };

        self.finish_provider_draft(facts, parsed, completion, report, cancel)
            .await
    }

    async fn finish_provider_draft(
        &self,
        facts: &Facts,
        parsed: ParsedDraft,
        completion: Completion,
        report: RetryReport,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let mut issues = Vec::new();
        let placeholders = placeholder::count_placeholders(&parsed.body);
        issues.extend(placeholder::placeholder_issue(placeholders));

        let mut input_tokens = completion.input_tokens;
        let mut output_tokens = completion.output_tokens;
        let mut critic = CriticStatus::Skipped;

        if self.critic_enabled {
            let critic_prompt = prompt::build_critic_prompt(facts, &parsed.body);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(GenerationError::Cancelled { attempts: report.attempts });
                }
                result = self.provider.critic_pass(&critic_prompt) => result,
            };

            match result {
                Ok(review) => {
                    let findings = self.parser.parse_critique(&review.text);
                    log::debug!("critic pass reported {} finding(s)", findings.len());
                    issues.extend(findings);
                    input_tokens = add_tokens(input_tokens, review.input_tokens);
                    output_tokens = add_tokens(output_tokens, review.output_tokens);
                    critic = CriticStatus::Completed;
                }
                Err(e) => {
                    log::warn!("critic pass failed, continuing without it: {}", e);
                    critic = CriticStatus::Failed;
                }
            }
        }

        Ok(GenerationResult {
            draft_markdown: parsed.body,
            issues,
            explanations: parsed.explanations,
            input_tokens,
            output_tokens,
            source: GenerationSource::Provider,
            provider: self.provider.name().to_string(),
            attempts: report.attempts,
            backoff_ms: backoff_millis(&report),
            critic,
        })
    }

    fn fallback(
        &self,
        facts: &Facts,
        reason: String,
        report: RetryReport,
        completion: Option<&Completion>,
    ) -> GenerationResult {
        log::warn!("using fallback draft: {}", reason);

        let draft_markdown =
            fallback::fallback_markdown(facts, chrono::Utc::now().date_naive());
        let mut issues = vec![reason, FALLBACK_ISSUE.to_string()];
        issues.extend(placeholder::placeholder_issue(
            placeholder::count_placeholders(&draft_markdown),
        ));

        GenerationResult {
            draft_markdown,
            issues,
            explanations: fallback::fallback_explanations(),
            input_tokens: completion.and_then(|c| c.input_tokens),
            output_tokens: completion.and_then(|c| c.output_tokens),
            source: GenerationSource::Fallback,
            provider: self.provider.name().to_string(),
            attempts: report.attempts,
            backoff_ms: backoff_millis(&report),
            critic: CriticStatus::Skipped,
        }
    }
}

fn backoff_millis(report: &RetryReport) -> Vec<u64> {
    report
        .backoff
        .iter()
        .map(|d| d.as_millis() as u64)
        .collect()
}

/// Choose the provider client from configuration. A missing key or the
/// `none` provider yields an always-unavailable provider.
pub fn build_provider(config: &LlmConfig, client: reqwest::Client) -> Arc<dyn DraftProvider> {
    let api_key = match (&config.provider, &config.api_key) {
        (ProviderKind::None, _) => {
            log::info!("LLM provider disabled; drafts will use the fallback template");
            return Arc::new(UnavailableProvider::new("LLM_PROVIDER is none"));
        }
        (_, None) => {
            log::warn!("LLM API key not set; drafts will use the fallback template");
            return Arc::new(UnavailableProvider::new("LLM API key not set"));
        }
        (_, Some(key)) => key.clone(),
    };

    match config.provider {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            client,
            config.base_url.clone(),
            api_key,
            config.model.clone(),
        )),
        _ => Arc::new(OpenAiProvider::new(
            client,
            config.base_url.clone(),
            api_key,
            config.model.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::provider::{Prompt, ProviderError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct Scripted {
        drafts: Mutex<VecDeque<Result<Completion, ProviderError>>>,
        critic: Mutex<Option<Result<Completion, ProviderError>>>,
        draft_calls: Mutex<u32>,
        critic_calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(drafts: Vec<Result<Completion, ProviderError>>) -> Self {
            Self {
                drafts: Mutex::new(drafts.into()),
                critic: Mutex::new(Some(Ok(Completion::text("NONE")))),
                draft_calls: Mutex::new(0),
                critic_calls: Mutex::new(0),
            }
        }

        fn with_critic(self, critic: Result<Completion, ProviderError>) -> Self {
            *self.critic.lock() = Some(critic);
            self
        }
    }

    #[async_trait]
    impl DraftProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &Prompt) -> Result<Completion, ProviderError> {
            *self.draft_calls.lock() += 1;
            self.drafts
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".into())))
        }

        async fn critic_pass(&self, _prompt: &Prompt) -> Result<Completion, ProviderError> {
            *self.critic_calls.lock() += 1;
            self.critic
                .lock()
                .take()
                .unwrap_or_else(|| Ok(Completion::text("NONE")))
        }
    }

    fn facts() -> Facts {
        serde_json::from_value(serde_json::json!({
            "parties": { "plaintiff": "John Doe", "defendant": "ACME Corp" },
            "incident": "defective product, no refund",
            "damages": { "amount_claimed": 500 }
        }))
        .unwrap()
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::exponential(max_retries, Duration::from_millis(1), Duration::from_millis(50))
    }

    fn throttled() -> Result<Completion, ProviderError> {
        Err(ProviderError::Http {
            status: 429,
            message: "rate limit exceeded".into(),
        })
    }

    const DRAFT: &str = "## Introduction\nWe represent John Doe.\n\n## Exhibits\n[MISSING: exhibits]\n\
---EXPLANATIONS---\n[SECTION: Introduction] Names the client.\n";

    #[tokio::test]
    async fn test_provider_draft_is_parsed() {
        let provider = Arc::new(Scripted::new(vec![Ok(Completion {
            text: DRAFT.into(),
            input_tokens: Some(100),
            output_tokens: Some(40),
        })]));
        let generator = DraftGenerator::new(provider.clone(), policy(3));

        let result = generator.generate(&facts(), None, None).await.unwrap();
        assert_eq!(result.source, GenerationSource::Provider);
        assert!(result.draft_markdown.ends_with("[MISSING: exhibits]"));
        assert_eq!(
            result.issues,
            vec!["draft contains 1 placeholder(s) for missing information".to_string()]
        );
        assert_eq!(result.explanations["Introduction"], "Names the client.");
        assert_eq!(result.input_tokens, Some(100));
        assert_eq!(result.critic, CriticStatus::Completed);
        assert_eq!(*provider.critic_calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let provider = Arc::new(Scripted::new(vec![
            throttled(),
            throttled(),
            Ok(Completion::text(DRAFT)),
        ]));
        let generator = DraftGenerator::new(provider.clone(), policy(3)).with_critic(false);

        let result = generator.generate(&facts(), None, None).await.unwrap();
        assert_eq!(result.source, GenerationSource::Provider);
        assert_eq!(*provider.draft_calls.lock(), 3);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.backoff_ms, vec![1, 2]);
        assert_eq!(result.critic, CriticStatus::Skipped);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back() {
        let provider = Arc::new(Scripted::new(vec![throttled(), throttled(), throttled()]));
        let generator = DraftGenerator::new(provider.clone(), policy(2));

        let result = generator.generate(&facts(), None, None).await.unwrap();
        assert_eq!(result.source, GenerationSource::Fallback);
        assert_eq!(*provider.draft_calls.lock(), 3);
        assert_eq!(*provider.critic_calls.lock(), 0);
        assert!(result.issues[0].starts_with("provider unavailable (throttled):"));
        assert!(result.issues[0].contains("after 3 attempt(s)"));
        assert!(result.issues.contains(&FALLBACK_ISSUE.to_string()));
        assert!(result.draft_markdown.contains("[MISSING: liability analysis]"));
    }

    #[tokio::test]
    async fn test_permanent_error_falls_back_after_one_call() {
        let provider = Arc::new(Scripted::new(vec![Err(ProviderError::Http {
            status: 401,
            message: "invalid api key".into(),
        })]));
        let generator = DraftGenerator::new(provider.clone(), policy(3));

        let result = generator.generate(&facts(), None, None).await.unwrap();
        assert_eq!(result.source, GenerationSource::Fallback);
        assert_eq!(*provider.draft_calls.lock(), 1);
        assert_eq!(
            result.issues[0],
            "provider unavailable (auth): provider returned HTTP 401: invalid api key"
        );
    }

    #[tokio::test]
    async fn test_empty_response_is_fallback_equivalent() {
        let provider = Arc::new(Scripted::new(vec![Ok(Completion::text("   \n"))]));
        let generator = DraftGenerator::new(provider, policy(0));

        let result = generator.generate(&facts(), None, None).await.unwrap();
        assert_eq!(result.source, GenerationSource::Fallback);
        assert_eq!(result.issues[0], UNPARSEABLE_ISSUE);
        let placeholders = placeholder::count_placeholders(&result.draft_markdown);
        assert_eq!(
            result.issues.last().unwrap(),
            &format!("draft contains {placeholders} placeholder(s) for missing information")
        );
    }

    #[tokio::test]
    async fn test_critic_findings_and_failures() {
        let provider = Arc::new(Scripted::new(vec![Ok(Completion::text(DRAFT))]).with_critic(
            Ok(Completion::text("UNSUPPORTED: ACME lied. | REASON: not in facts")),
        ));
        let result = DraftGenerator::new(provider, policy(0))
            .generate(&facts(), None, None)
            .await
            .unwrap();
        assert!(result
            .issues
            .contains(&"unsupported claim: \"ACME lied.\" (not in facts)".to_string()));

        let provider = Arc::new(
            Scripted::new(vec![Ok(Completion::text(DRAFT))])
                .with_critic(Err(ProviderError::Timeout("slow".into()))),
        );
        let result = DraftGenerator::new(provider, policy(0))
            .generate(&facts(), None, None)
            .await
            .unwrap();
        assert_eq!(result.source, GenerationSource::Provider);
        assert_eq!(result.critic, CriticStatus::Failed);
        assert_eq!(result.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let provider = Arc::new(Scripted::new(vec![Ok(Completion::text(DRAFT))]));
        let generator = DraftGenerator::new(provider.clone(), policy(3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = generator
            .generate_with_cancel(&facts(), None, None, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Cancelled { attempts: 0 });
        assert_eq!(*provider.draft_calls.lock(), 0);
    }

    #[test]
    fn test_build_provider_without_key_is_unavailable() {
        let config = LlmConfig {
            provider: ProviderKind::OpenAi,
            api_key: None,
            ..LlmConfig::default()
        };
        assert_eq!(build_provider(&config, reqwest::Client::new()).name(), "none");

        let config = LlmConfig {
            provider: ProviderKind::Anthropic,
            api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        };
        assert_eq!(build_provider(&config, reqwest::Client::new()).name(), "anthropic");
    }

    #[test]
    fn test_style_hints_merge() {
        let request = StyleHints {
            tone: Some("firm".into()),
            ..Default::default()
        };
        let template = StyleHints {
            tone: Some("polite".into()),
            letterhead: Some("Smith LLP".into()),
            jurisdiction: Some("CA".into()),
        };
        let merged = request.or(Some(&template));
        assert_eq!(merged.tone.as_deref(), Some("firm"));
        assert_eq!(merged.letterhead.as_deref(), Some("Smith LLP"));
        assert_eq!(merged.jurisdiction.as_deref(), Some("CA"));
        assert!(!merged.is_empty());
    }
}
