use std::sync::Arc;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::ApiCaller;
use crate::drafts::model::{
    Draft, DraftSummary, ExportQuery, ExportRequest, GenerateRequest, GenerateResponse, NewDraft,
};
use crate::render::{self, DOCX_MIME};
use crate::{AppState, ErrorResponse};

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Render on the blocking pool; rendering is CPU-bound.
async fn render_docx(markdown: String, letterhead: Option<String>) -> Result<Vec<u8>, HttpResponse> {
    web::block(move || render::render(&markdown, letterhead.as_deref()))
        .await
        .map_err(|e| {
            log::error!("render task failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to render document"))
        })
}

fn docx_response(bytes: &[u8], filename: &str) -> HttpResponse {
    let filename = sanitize_filename::sanitize(filename);
    HttpResponse::Ok()
        .content_type(DOCX_MIME)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(Bytes::copy_from_slice(bytes))
}

#[utoipa::path(
    post,
    path = "/api/facts/{id}/generate",
    tag = "Drafts",
    params(
        ("id" = Uuid, Path, description = "Facts ID")
    ),
    request_body = GenerateRequest,
    responses(
        (status = 201, description = "Draft generated and stored as the next version", body = GenerateResponse),
        (status = 404, description = "Facts or template not found", body = ErrorResponse)
    )
)]
pub async fn generate_draft(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: Option<web::Json<GenerateRequest>>,
) -> Result<HttpResponse, actix_web::Error> {
    let facts_id = path.into_inner();
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    let record = state.store.get_facts(facts_id)?;
    let template = match request.template_id.as_deref() {
        Some(id) => Some(state.store.get_template(id)?),
        None => None,
    };
    let mut style = request.style().or(template.as_ref().map(|t| &t.style));
    style.jurisdiction = template
        .as_ref()
        .and_then(|t| non_blank(t.jurisdiction.as_deref()));

    let result = match state
        .generator
        .generate(
            &record.facts,
            template.as_ref().map(|t| t.content.as_str()),
            (!style.is_empty()).then_some(&style),
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            log::warn!("generation for facts {} aborted: {}", facts_id, e);
            return Ok(HttpResponse::ServiceUnavailable()
                .json(ErrorResponse::new("Cancelled", &e.to_string())));
        }
    };
    state.metrics.record(&result);

    let attempts = result.attempts;
    let backoff_ms = result.backoff_ms.clone();
    let critic = result.critic;
    let mut new_draft = NewDraft::from(result);
    new_draft.letterhead = non_blank(style.letterhead.as_deref());
    let draft = state.store.append_draft(facts_id, new_draft).await?;

    Ok(HttpResponse::Created().json(GenerateResponse {
        draft,
        attempts,
        backoff_ms,
        critic,
    }))
}

#[utoipa::path(
    get,
    path = "/api/facts/{id}/drafts",
    tag = "Drafts",
    params(
        ("id" = Uuid, Path, description = "Facts ID")
    ),
    responses(
        (status = 200, description = "Draft versions, oldest first", body = Vec<DraftSummary>),
        (status = 404, description = "Facts not found", body = ErrorResponse)
    )
)]
pub async fn list_drafts(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, actix_web::Error> {
    let drafts = state.store.list_drafts(path.into_inner())?;
    let summaries: Vec<DraftSummary> = drafts.iter().map(DraftSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[utoipa::path(
    get,
    path = "/api/facts/{id}/drafts/{version}",
    tag = "Drafts",
    params(
        ("id" = Uuid, Path, description = "Facts ID"),
        ("version" = u32, Path, description = "Draft version")
    ),
    responses(
        (status = 200, description = "Draft found", body = Draft),
        (status = 404, description = "Facts or version not found", body = ErrorResponse)
    )
)]
pub async fn get_draft(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, u32)>,
) -> Result<HttpResponse, actix_web::Error> {
    let (facts_id, version) = path.into_inner();
    let draft = state.store.get_draft(facts_id, version)?;
    Ok(HttpResponse::Ok().json(draft))
}

#[utoipa::path(
    post,
    path = "/api/facts/{id}/drafts/{version}/restore",
    tag = "Drafts",
    params(
        ("id" = Uuid, Path, description = "Facts ID"),
        ("version" = u32, Path, description = "Version to restore")
    ),
    responses(
        (status = 201, description = "Version copied forward as the new latest draft", body = Draft),
        (status = 404, description = "Facts or version not found", body = ErrorResponse)
    )
)]
pub async fn restore_draft(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, u32)>,
) -> Result<HttpResponse, actix_web::Error> {
    let (facts_id, version) = path.into_inner();
    let draft = state.store.restore_draft(facts_id, version).await?;
    Ok(HttpResponse::Created().json(draft))
}

#[utoipa::path(
    get,
    path = "/api/facts/{id}/drafts/{version}/export",
    tag = "Drafts",
    params(
        ("id" = Uuid, Path, description = "Facts ID"),
        ("version" = u32, Path, description = "Draft version"),
        ("letterhead" = Option<String>, Query, description = "Letterhead printed above the letter; defaults to the one used at generation")
    ),
    responses(
        (status = 200, description = "Word document (application/vnd.openxmlformats-officedocument.wordprocessingml.document)"),
        (status = 404, description = "Facts or version not found", body = ErrorResponse)
    )
)]
pub async fn export_draft(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, u32)>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let (facts_id, version) = path.into_inner();
    let record = state.store.get_facts(facts_id)?;
    let draft = state.store.get_draft(facts_id, version)?;
    let letterhead = non_blank(query.letterhead.as_deref()).or(draft.letterhead);
    let filename = format!(
        "demand-letter-{}-v{}.docx",
        record.facts.parties.defendant, version
    );

    let key = (facts_id, version, letterhead.clone());
    if let Some(bytes) = state.export_cache.get(&key).await {
        log::debug!("export cache hit for facts {} v{}", facts_id, version);
        return Ok(docx_response(&bytes, &filename));
    }

    let bytes = match render_docx(draft.draft_markdown, letterhead).await {
        Ok(bytes) => Arc::new(bytes),
        Err(response) => return Ok(response),
    };
    state.export_cache.insert(key, bytes.clone()).await;

    Ok(docx_response(&bytes, &filename))
}

#[utoipa::path(
    post,
    path = "/api/export",
    tag = "Drafts",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Word document (application/vnd.openxmlformats-officedocument.wordprocessingml.document)")
    )
)]
pub async fn export_markdown(
    _caller: ApiCaller,
    body: web::Json<ExportRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let letterhead = non_blank(request.letterhead.as_deref());

    match render_docx(request.draft_markdown, letterhead).await {
        Ok(bytes) => docx_response(&bytes, "demand-letter.docx"),
        Err(response) => response,
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/facts/{id}/generate").route(web::post().to(generate_draft)))
        .service(web::resource("/facts/{id}/drafts").route(web::get().to(list_drafts)))
        .service(web::resource("/facts/{id}/drafts/{version}").route(web::get().to(get_draft)))
        .service(
            web::resource("/facts/{id}/drafts/{version}/restore")
                .route(web::post().to(restore_draft)),
        )
        .service(
            web::resource("/facts/{id}/drafts/{version}/export")
                .route(web::get().to(export_draft)),
        )
        .service(web::resource("/export").route(web::post().to(export_markdown)));
}
