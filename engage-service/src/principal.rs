use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::Error;

/// The authenticated principal, as forwarded by the upstream auth layer in
/// the `x-user-id` header. Token validation happens upstream; the store
/// resolves the role once per request and passes it into core operations
/// explicitly.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                Error::PermissionDenied("missing or invalid x-user-id header".to_string())
            })?;

        Ok(Principal { user_id })
    }
}
