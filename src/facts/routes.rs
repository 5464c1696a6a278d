use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::ApiCaller;
use crate::db::StoreError;
use crate::facts::{Facts, FactsRecord, ImportReport};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/facts",
    tag = "Facts",
    request_body = Facts,
    responses(
        (status = 201, description = "Facts stored", body = FactsRecord),
        (status = 400, description = "Validation failed", body = crate::ErrorResponse)
    )
)]
pub async fn create_facts(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    body: web::Json<Facts>,
) -> Result<HttpResponse, StoreError> {
    let record = state.store.create_facts(body.into_inner())?;
    Ok(HttpResponse::Created().json(record))
}

#[utoipa::path(
    post,
    path = "/api/facts/import",
    tag = "Facts",
    request_body = Vec<Facts>,
    responses(
        (status = 200, description = "Every record stored", body = ImportReport),
        (status = 207, description = "Some records failed validation; the rest were stored", body = ImportReport)
    )
)]
pub async fn import_facts(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    body: web::Json<Vec<Facts>>,
) -> HttpResponse {
    let report = state.store.import_facts(body.into_inner());
    let status = if report.rejected.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    HttpResponse::build(status).json(report)
}

#[utoipa::path(
    get,
    path = "/api/facts",
    tag = "Facts",
    responses(
        (status = 200, description = "All facts records, oldest first", body = Vec<FactsRecord>)
    )
)]
pub async fn list_facts(_caller: ApiCaller, state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.list_facts())
}

#[utoipa::path(
    get,
    path = "/api/facts/{id}",
    tag = "Facts",
    params(
        ("id" = Uuid, Path, description = "Facts ID")
    ),
    responses(
        (status = 200, description = "Facts found", body = FactsRecord),
        (status = 404, description = "Facts not found", body = crate::ErrorResponse)
    )
)]
pub async fn get_facts(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, StoreError> {
    let record = state.store.get_facts(path.into_inner())?;
    Ok(HttpResponse::Ok().json(record))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/facts/import").route(web::post().to(import_facts)))
        .service(
            web::resource("/facts")
                .route(web::get().to(list_facts))
                .route(web::post().to(create_facts)),
        )
        .service(web::resource("/facts/{id}").route(web::get().to(get_facts)));
}
