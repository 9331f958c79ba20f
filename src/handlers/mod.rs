pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod images;
pub mod orders;
pub mod payments;

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};

use crate::domain::auth::Principal;
use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::state::AppState;

/// Runs blocking service code (diesel, bcrypt, the Stripe client) on the
/// actix thread pool.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

fn extract_bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// `Ok(None)` when no token is sent; an invalid token is always an error.
fn authenticate(req: &HttpRequest) -> Result<Option<Principal>, AppError> {
    let Some(token) = extract_bearer_token(req) else {
        return Ok(None);
    };
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
    Ok(Some(state.tokens.verify_access(token)?))
}

/// A caller with a valid access token.
pub struct Authenticated(pub Principal);

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|principal| {
            principal
                .map(Authenticated)
                .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
        }))
    }
}

/// A caller that may be anonymous.
pub struct MaybeAuthenticated(pub Option<Principal>);

impl FromRequest for MaybeAuthenticated {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(MaybeAuthenticated))
    }
}
