#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use async_trait::async_trait;
use parking_lot::Mutex;

use demand_letter_server::facts::Facts;
use demand_letter_server::generation::provider::{
    Completion, DraftProvider, Prompt, ProviderError,
};
use demand_letter_server::generation::retry::RetryPolicy;
use demand_letter_server::generation::DraftGenerator;
use demand_letter_server::AppState;

pub const PROVIDER_DRAFT: &str = "# Demand Letter\n\n\
## Introduction\n\nThis office represents John Doe.\n\n\
## Demand\n\nPay $500 within 14 days.\n\n\
---EXPLANATIONS---\n\
[SECTION: Introduction] Identifies the sender.\n\
[SECTION: Demand] States the amount owed.";

/// Provider that replays queued drafting results, then fails permanently.
pub struct ScriptedProvider {
    drafts: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    critic: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    pub draft_calls: Mutex<u32>,
    pub critic_calls: Mutex<u32>,
    /// User prompts of every drafting call, in order.
    pub draft_prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(drafts: Vec<Result<Completion, ProviderError>>) -> Self {
        Self {
            drafts: Mutex::new(drafts.into()),
            critic: Mutex::new(VecDeque::new()),
            draft_calls: Mutex::new(0),
            critic_calls: Mutex::new(0),
            draft_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_critic(self, critic: Vec<Result<Completion, ProviderError>>) -> Self {
        *self.critic.lock() = critic.into();
        self
    }

    /// Always answers with [`PROVIDER_DRAFT`].
    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl DraftProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        *self.draft_calls.lock() += 1;
        self.draft_prompts.lock().push(prompt.user.clone());
        self.drafts.lock().pop_front().unwrap_or_else(|| {
            Ok(Completion {
                text: PROVIDER_DRAFT.to_string(),
                input_tokens: Some(120),
                output_tokens: Some(80),
            })
        })
    }

    async fn critic_pass(&self, _prompt: &Prompt) -> Result<Completion, ProviderError> {
        *self.critic_calls.lock() += 1;
        self.critic
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("NONE")))
    }
}

pub fn throttled() -> ProviderError {
    ProviderError::Http {
        status: 429,
        message: "Too many requests".to_string(),
    }
}

pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::exponential(max_retries, Duration::from_millis(1), Duration::from_millis(4))
}

pub fn generator(provider: Arc<ScriptedProvider>) -> DraftGenerator {
    DraftGenerator::new(provider, fast_policy(2))
}

pub fn test_app_state(generator: DraftGenerator, api_token: Option<&str>) -> web::Data<AppState> {
    let state = AppState::with_generator(generator, api_token.map(str::to_string))
        .expect("Failed to create AppState");
    web::Data::new(state)
}

pub fn john_doe_json() -> serde_json::Value {
    serde_json::json!({
        "parties": { "plaintiff": "John Doe", "defendant": "ACME Corp" },
        "incident": "Defective product, no refund",
        "damages": { "amount_claimed": 500.0 },
        "venue": "CA"
    })
}

pub fn john_doe() -> Facts {
    serde_json::from_value(john_doe_json()).expect("valid facts")
}

pub fn complete_facts() -> Facts {
    serde_json::from_value(serde_json::json!({
        "parties": {
            "plaintiff": "Jane Roe",
            "defendant": "Globex LLC",
            "attorney": "Sam Counsel",
            "firm": "Counsel & Co"
        },
        "incident": "Water damage from a burst pipe the landlord refused to repair",
        "damages": {
            "amount_claimed": 1234.5,
            "specials": [{ "item": "Repair invoice", "amount": 1000.0 }],
            "generals": [{ "item": "Loss of use", "amount": 234.5 }]
        },
        "venue": "Los Angeles County, CA",
        "incident_date": "2024-03-01",
        "demand_deadline_days": 30,
        "exhibits": [{ "name": "Invoice", "description": "Plumber's repair invoice" }]
    }))
    .expect("valid facts")
}
