use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use tracing::warn;

use crate::auth::TokenService;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// The verified caller of a protected route.
///
/// Taking `Identity` as a handler argument gates that handler: extraction
/// runs [`token_required`] first and the handler only executes on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

/// Pulls the token out of `Authorization: <scheme> <token>` and verifies it.
/// The scheme segment is not inspected.
pub fn token_required(req: &HttpRequest, tokens: &TokenService) -> Result<Identity, AuthError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(' ').nth(1))
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let email = tokens.verify(token)?;
    Ok(Identity { email })
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<AppState>>() {
            Some(state) => token_required(req, &state.tokens).map_err(|e| {
                warn!("Rejected request to {}: {}", req.path(), e);
                AppError::from(e)
            }),
            None => Err(AppError::InternalError("application state not configured".into())),
        };
        ready(result)
    }
}
