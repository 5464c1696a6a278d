use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, http::StatusCode, web, App, HttpResponse, HttpServer, ResponseError};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

pub mod auth;
pub mod config;
pub mod db;
pub mod drafts;
pub mod facts;
pub mod generation;
pub mod metrics;
pub mod render;
pub mod templates;

pub use crate::db::{AppState, StoreError};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new("Unauthorized", message)
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::FactsNotFound(_)
            | StoreError::DraftNotFound { .. }
            | StoreError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let body = match self {
            StoreError::Validation(_) => ErrorResponse::bad_request(&message),
            _ => ErrorResponse::not_found(&message),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        provider: state.generator.provider_name().to_string(),
    })
}

/// Generation counters in Prometheus text format.
pub async fn generation_metrics(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.encode() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            log::error!("failed to encode generation metrics: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to encode metrics"))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        crate::facts::routes::create_facts,
        crate::facts::routes::import_facts,
        crate::facts::routes::list_facts,
        crate::facts::routes::get_facts,
        crate::templates::routes::upsert_template,
        crate::templates::routes::list_templates,
        crate::templates::routes::get_template,
        crate::drafts::routes::generate_draft,
        crate::drafts::routes::list_drafts,
        crate::drafts::routes::get_draft,
        crate::drafts::routes::restore_draft,
        crate::drafts::routes::export_draft,
        crate::drafts::routes::export_markdown
    ),
    components(
        schemas(
            facts::Facts,
            facts::Parties,
            facts::Damages,
            facts::DamageItem,
            facts::Exhibit,
            facts::FactsRecord,
            facts::ImportReport,
            facts::ImportedFacts,
            facts::RejectedFacts,
            templates::Template,
            templates::UpsertTemplateRequest,
            drafts::model::Draft,
            drafts::model::DraftSummary,
            drafts::model::GenerateRequest,
            drafts::model::GenerateResponse,
            drafts::model::ExportRequest,
            generation::StyleHints,
            generation::GenerationSource,
            generation::CriticStatus,
            HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Facts", description = "Case facts intake."),
        (name = "Templates", description = "Letter templates."),
        (name = "Drafts", description = "Draft generation, versions and Word export."),
        (name = "System", description = "Health and diagnostics.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Local server")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Register every `/api` route on `cfg`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(facts::routes::config)
        .configure(templates::routes::config)
        .configure(drafts::routes::config);
}

/// Routes outside `/api`: health, generation metrics and the OpenAPI document.
pub fn configure_system(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/metrics/generation").route(web::get().to(generation_metrics)))
        .service(web::resource("/api-doc/openapi.json").route(web::get().to(openapi_json)));
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = crate::config::AppConfig::from_env();
    let app_state = match AppState::new(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialize application state: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &config.facts_seed_path {
        match app_state.store.seed_facts(path) {
            Ok(report) => log::info!(
                "seeded {} facts record(s) from {} ({} rejected)",
                report.imported.len(),
                path.display(),
                report.rejected.len()
            ),
            Err(e) => log::error!("Failed to load facts seed: {:#}", e),
        }
    }

    let prometheus = PrometheusMetricsBuilder::new("demand_letter_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!("Starting server at http://{}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .app_data(web::JsonConfig::default().limit(1024 * 1024))
            .configure(configure_system)
            .service(web::scope("/api").configure(configure_api))
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
