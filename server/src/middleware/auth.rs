use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::models::{Caller, Role};
use crate::utils::error::AppError;

/// Set by the authenticating gateway in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let user_id = header_str(headers, USER_ID_HEADER)?
        .parse::<Uuid>()
        .map_err(|_| AppError::AuthError(format!("{} is not a valid id", USER_ID_HEADER)))?;
    let role = header_str(headers, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|_| AppError::AuthError(format!("{} is not a known role", USER_ROLE_HEADER)))?;

    Ok(Caller { user_id, role })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::AuthError(format!("missing {} header", name)))
}

pub fn require_admin(caller: &Caller) -> Result<(), AppError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}
