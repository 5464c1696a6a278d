//! In-memory store and shared application state.
//!
//! The store is split by record type:
//! - `facts` - facts records (immutable once created)
//! - `drafts` - append-only draft versions per facts record
//! - `templates` - letter templates, upserted by slug

mod drafts;
mod facts;
mod templates;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use moka::future::Cache;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::drafts::model::Draft;
use crate::facts::FactsRecord;
use crate::generation::DraftGenerator;
use crate::metrics::GenerationMetrics;
use crate::templates::model::Template;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("facts {0} not found")]
    FactsNotFound(Uuid),
    #[error("draft version {version} not found for facts {facts_id}")]
    DraftNotFound { facts_id: Uuid, version: u32 },
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
    #[error("{0}")]
    Validation(String),
}

#[derive(Default)]
pub struct DraftStore {
    facts: RwLock<HashMap<Uuid, FactsRecord>>,
    drafts: RwLock<HashMap<Uuid, Vec<Draft>>>,
    templates: RwLock<HashMap<String, Template>>,
    /// Serializes version assignment per facts record.
    version_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn version_lock(&self, facts_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.version_locks
            .lock()
            .entry(facts_id)
            .or_default()
            .clone()
    }
}

/// Rendered `.docx` exports keyed by `(facts_id, version, letterhead)`.
pub type ExportCache = Cache<(Uuid, u32, Option<String>), Arc<Vec<u8>>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DraftStore>,
    pub generator: Arc<DraftGenerator>,
    pub export_cache: ExportCache,
    pub metrics: GenerationMetrics,
    /// Static bearer token for `/api`; `None` leaves the API open.
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .timeout(config.llm.request_timeout)
            .user_agent("demand-letter-server/0.1")
            .build()
            .context("failed to create reqwest client")?;

        let generator = DraftGenerator::from_config(&config.llm, http_client);
        log::info!("draft provider: {}", generator.provider_name());

        Self::with_generator(generator, config.api_token.clone())
    }

    pub fn with_generator(
        generator: DraftGenerator,
        api_token: Option<String>,
    ) -> anyhow::Result<Self> {
        let export_cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(100)
            .build();

        let metrics = GenerationMetrics::new().context("failed to register generation metrics")?;

        Ok(AppState {
            store: Arc::new(DraftStore::new()),
            generator: Arc::new(generator),
            export_cache,
            metrics,
            api_token,
        })
    }
}
