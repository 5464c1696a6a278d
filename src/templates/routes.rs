use actix_web::{web, HttpResponse};

use crate::auth::ApiCaller;
use crate::db::StoreError;
use crate::templates::model::{Template, UpsertTemplateRequest};
use crate::AppState;

#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template slug")
    ),
    request_body = UpsertTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = Template),
        (status = 200, description = "Template replaced", body = Template),
        (status = 400, description = "Validation failed", body = crate::ErrorResponse)
    )
)]
pub async fn upsert_template(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpsertTemplateRequest>,
) -> Result<HttpResponse, StoreError> {
    let template = body.into_inner().into_template(path.into_inner());
    let (template, created) = state.store.upsert_template(template)?;

    if created {
        Ok(HttpResponse::Created().json(template))
    } else {
        Ok(HttpResponse::Ok().json(template))
    }
}

#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "Templates",
    responses(
        (status = 200, description = "All templates", body = Vec<Template>)
    )
)]
pub async fn list_templates(_caller: ApiCaller, state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.list_templates())
}

#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(
        ("id" = String, Path, description = "Template slug")
    ),
    responses(
        (status = 200, description = "Template found", body = Template),
        (status = 404, description = "Template not found", body = crate::ErrorResponse)
    )
)]
pub async fn get_template(
    _caller: ApiCaller,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let template = state.store.get_template(&path)?;
    Ok(HttpResponse::Ok().json(template))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/templates").route(web::get().to(list_templates)))
        .service(
            web::resource("/templates/{id}")
                .route(web::get().to(get_template))
                .route(web::put().to(upsert_template)),
        );
}
