//! Static bearer-token guard for `/api` routes.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::{web, Error, FromRequest, HttpRequest, HttpResponse};

use crate::{AppState, ErrorResponse};

/// Extract token from Authorization header
fn extract_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare without returning early on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn unauthorized(message: &str) -> Error {
    InternalError::from_response(
        message.to_string(),
        HttpResponse::Unauthorized().json(ErrorResponse::unauthorized(message)),
    )
    .into()
}

/// Check the request against the configured API token.
pub fn validate_request_token(req: &HttpRequest) -> Result<(), Error> {
    let expected = match req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.api_token.as_deref())
    {
        Some(token) => token,
        None => return Ok(()),
    };

    let token = extract_token(req).ok_or_else(|| unauthorized("Missing authorization token"))?;
    if !tokens_match(token, expected) {
        log::warn!("rejected request to {} with invalid token", req.path());
        return Err(unauthorized("Invalid authorization token"));
    }
    Ok(())
}

/// Extractor that admits a request only when it carries the API token.
pub struct ApiCaller;

impl FromRequest for ApiCaller {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(validate_request_token(req).map(|_| ApiCaller))
    }
}
