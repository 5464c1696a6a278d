mod common;

use std::sync::Arc;
use std::time::Duration;

use demand_letter_server::generation::placeholder::find_placeholders;
use demand_letter_server::generation::provider::{Completion, ProviderError};
use demand_letter_server::generation::retry::RetryPolicy;
use demand_letter_server::generation::{
    CriticStatus, DraftGenerator, GenerationError, GenerationSource, StyleHints, FALLBACK_ISSUE,
    UNPARSEABLE_ISSUE,
};
use tokio_util::sync::CancellationToken;

use common::{generator, john_doe, throttled, ScriptedProvider};

#[tokio::test]
async fn test_provider_draft_is_returned_with_explanations() {
    let provider = Arc::new(ScriptedProvider::succeeding());
    let result = generator(provider.clone())
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Provider);
    assert_eq!(result.provider, "scripted");
    assert!(result.draft_markdown.starts_with("# Demand Letter"));
    assert!(!result.draft_markdown.contains("---EXPLANATIONS---"));
    assert_eq!(
        result.explanations.get("Demand").map(String::as_str),
        Some("States the amount owed.")
    );
    assert_eq!(result.attempts, 1);
    assert!(result.backoff_ms.is_empty());
    assert_eq!(result.critic, CriticStatus::Completed);
    assert!(result.issues.is_empty());
    assert_eq!(*provider.critic_calls.lock(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_growing_backoff() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(throttled()), Err(throttled())]));
    let policy = RetryPolicy::exponential(3, Duration::from_millis(2), Duration::from_millis(50));
    let result = DraftGenerator::new(provider.clone(), policy)
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Provider);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.backoff_ms, vec![2, 4]);
    assert_eq!(*provider.draft_calls.lock(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_fall_back_to_template() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(throttled()),
        Err(throttled()),
        Err(throttled()),
    ]));
    let result = generator(provider.clone())
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Fallback);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.backoff_ms.len(), 2);
    assert!(result.issues[0].starts_with("provider unavailable (throttled):"));
    assert!(result.issues[0].ends_with("(after 3 attempt(s))"));
    assert_eq!(result.issues[1], FALLBACK_ISSUE);
    assert_eq!(result.critic, CriticStatus::Skipped);
    assert_eq!(*provider.critic_calls.lock(), 0);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Http {
        status: 401,
        message: "invalid api key".to_string(),
    })]));
    let result = generator(provider.clone())
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Fallback);
    assert_eq!(result.attempts, 1);
    assert_eq!(*provider.draft_calls.lock(), 1);
    assert!(result.issues[0].starts_with("provider unavailable (auth):"));
    assert!(result.issues[0].contains("invalid api key"));
}

#[tokio::test]
async fn test_auth_failure_with_retry_hint_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Http {
        status: 403,
        message: "Service temporarily unavailable, try again later".to_string(),
    })]));
    let result = generator(provider.clone())
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Fallback);
    assert_eq!(result.attempts, 1);
    assert!(result.backoff_ms.is_empty());
    assert_eq!(*provider.draft_calls.lock(), 1);
    assert!(result.issues[0].starts_with("provider unavailable (auth):"));
}

#[tokio::test]
async fn test_john_doe_fallback_letter() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::NotConfigured(
        "no key".to_string(),
    ))]));
    let result = generator(provider)
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    let md = &result.draft_markdown;
    assert!(md.contains("John Doe"));
    assert!(md.contains("ACME Corp"));
    assert!(md.contains("$500"));
    assert!(md.contains("CA"));
    assert!(md.contains("Defective product, no refund"));

    let labels = find_placeholders(md);
    assert!(labels.iter().any(|l| l == "attorney name"));
    assert!(labels.iter().any(|l| l == "incident date"));
    assert!(!labels.iter().any(|l| l == "venue"));
    assert!(!labels.iter().any(|l| l == "amount claimed"));

    let summary = format!(
        "draft contains {} placeholder(s) for missing information",
        labels.len()
    );
    assert!(result.issues.contains(&summary));
    assert!(!result.explanations.is_empty());
}

#[tokio::test]
async fn test_empty_provider_response_uses_fallback() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion {
        text: "   \n---EXPLANATIONS---\n[SECTION: Demand] nothing".to_string(),
        input_tokens: Some(40),
        output_tokens: Some(2),
    })]));
    let result = generator(provider)
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Fallback);
    assert_eq!(result.issues[0], UNPARSEABLE_ISSUE);
    assert_eq!(result.issues[1], FALLBACK_ISSUE);
    assert_eq!(result.input_tokens, Some(40));
}

#[tokio::test]
async fn test_critic_findings_become_issues_and_tokens_add_up() {
    let provider = Arc::new(ScriptedProvider::succeeding().with_critic(vec![Ok(Completion {
        text: "UNSUPPORTED: Pay $500 within 14 days. | REASON: no deadline in facts".to_string(),
        input_tokens: Some(30),
        output_tokens: Some(10),
    })]));
    let result = generator(provider)
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.critic, CriticStatus::Completed);
    assert_eq!(
        result.issues,
        vec!["unsupported claim: \"Pay $500 within 14 days.\" (no deadline in facts)".to_string()]
    );
    assert_eq!(result.input_tokens, Some(150));
    assert_eq!(result.output_tokens, Some(90));
}

#[tokio::test]
async fn test_critic_failure_keeps_the_draft() {
    let provider = Arc::new(
        ScriptedProvider::succeeding()
            .with_critic(vec![Err(ProviderError::Transport("connection reset".to_string()))]),
    );
    let result = generator(provider.clone())
        .generate(&john_doe(), None, None)
        .await
        .unwrap();

    assert_eq!(result.source, GenerationSource::Provider);
    assert_eq!(result.critic, CriticStatus::Failed);
    assert!(result.issues.is_empty());
    assert_eq!(*provider.critic_calls.lock(), 1);
}

#[tokio::test]
async fn test_critic_can_be_disabled() {
    let provider = Arc::new(ScriptedProvider::succeeding());
    let result = generator(provider.clone())
        .with_critic(false)
        .generate(&john_doe(), Some("Use a formal tone."), Some(&StyleHints::default()))
        .await
        .unwrap();

    assert_eq!(result.critic, CriticStatus::Skipped);
    assert_eq!(*provider.critic_calls.lock(), 0);
}

#[tokio::test]
async fn test_cancellation_during_backoff() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(throttled()), Err(throttled())]));
    let policy = RetryPolicy::exponential(3, Duration::from_secs(30), Duration::from_secs(60));
    let generator = DraftGenerator::new(provider.clone(), policy);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = generator
        .generate_with_cancel(&john_doe(), None, None, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, GenerationError::Cancelled { attempts: 1 });
    assert_eq!(*provider.draft_calls.lock(), 1);
}
