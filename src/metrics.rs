//! Generation counters, kept on a registry owned by the app state.
//!
//! HTTP request metrics come from the actix middleware at `/metrics`; these
//! are served separately at `/metrics/generation`.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::generation::{CriticStatus, GenerationResult};

const NAMESPACE: &str = "demand_letter";

#[derive(Clone)]
pub struct GenerationMetrics {
    registry: Registry,
    generations: IntCounterVec,
    provider_attempts: IntCounter,
    critic_failures: IntCounter,
}

impl GenerationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let generations = IntCounterVec::new(
            Opts::new("generations_total", "Drafts generated, by source").namespace(NAMESPACE),
            &["source"],
        )?;
        let provider_attempts = IntCounter::with_opts(
            Opts::new("provider_attempts_total", "Drafting calls made to the provider")
                .namespace(NAMESPACE),
        )?;
        let critic_failures = IntCounter::with_opts(
            Opts::new("critic_failures_total", "Critic passes that failed and were skipped")
                .namespace(NAMESPACE),
        )?;

        registry.register(Box::new(generations.clone()))?;
        registry.register(Box::new(provider_attempts.clone()))?;
        registry.register(Box::new(critic_failures.clone()))?;

        Ok(Self {
            registry,
            generations,
            provider_attempts,
            critic_failures,
        })
    }

    pub fn record(&self, result: &GenerationResult) {
        self.generations
            .with_label_values(&[result.source.as_str()])
            .inc();
        self.provider_attempts.inc_by(u64::from(result.attempts));
        if result.critic == CriticStatus::Failed {
            self.critic_failures.inc();
        }
    }

    pub fn generations(&self, source: &str) -> u64 {
        self.generations.with_label_values(&[source]).get()
    }

    /// Text exposition of every counter.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
