//! Environment-driven configuration.
//!
//! Every setting has a default so the server starts (and degrades to the
//! fallback draft) even with an empty environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::generation::retry::RetryPolicy;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    /// No provider; every generation uses the fallback draft.
    None,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "none" | "offline" | "" => Ok(Self::None),
            other => Err(format!(
                "unknown LLM_PROVIDER: {} (use openai, anthropic, or none)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
    pub critic_enabled: bool,
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_retries, self.base_backoff, self.max_backoff)
    }

    pub fn from_env() -> Self {
        let provider = env::var("LLM_PROVIDER")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    log::warn!("{}; falling back to openai", e);
                    None
                }
            })
            .unwrap_or(ProviderKind::OpenAi);

        let (default_model, default_base, key_var) = match provider {
            ProviderKind::Anthropic => (
                DEFAULT_ANTHROPIC_MODEL,
                DEFAULT_ANTHROPIC_BASE_URL,
                "ANTHROPIC_API_KEY",
            ),
            _ => (DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_BASE_URL, "OPENAI_API_KEY"),
        };

        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var(key_var))
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self {
            provider,
            model: env::var("LLM_MODEL").unwrap_or_else(|_| default_model.to_string()),
            api_key,
            base_url: env::var("LLM_BASE_URL").unwrap_or_else(|_| default_base.to_string()),
            max_retries: parse_var("LLM_MAX_RETRIES", 3),
            base_backoff: Duration::from_millis(parse_var("LLM_BACKOFF_MS", 500)),
            max_backoff: Duration::from_millis(parse_var("LLM_MAX_BACKOFF_MS", 8_000)),
            request_timeout: Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", 60)),
            critic_enabled: parse_var("LLM_CRITIC_ENABLED", true),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            request_timeout: Duration::from_secs(60),
            critic_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// Static bearer token for `/api` routes. `None` disables the check.
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub port: u16,
    /// JSON array of facts imported at startup.
    pub facts_seed_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_token = env::var("API_TOKEN").ok().filter(|t| !t.trim().is_empty());
        if api_token.is_none() {
            log::warn!("API_TOKEN not set, /api routes are unauthenticated. SET THIS IN PRODUCTION!");
        }

        Self {
            llm: LlmConfig::from_env(),
            api_token,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080),
            facts_seed_path: env::var("FACTS_SEED_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("{}={:?} is not valid, using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
