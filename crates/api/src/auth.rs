//! The authentication seam.
//!
//! Session issuance, login and password handling all live in the upstream
//! auth layer; by the time a request reaches this service that layer has
//! resolved the session to a user id and injected it as a header. This
//! module only answers "who is the current user".

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the upstream auth
/// layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user of the current request.
///
/// Rejects with 401 when the header is missing or malformed.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::AuthRequired)?;
        let uuid = Uuid::parse_str(raw).map_err(|_| ApiError::AuthRequired)?;
        Ok(CurrentUser(UserId::from_uuid(uuid)))
    }
}
