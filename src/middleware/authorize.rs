use axum::{extract::Request, middleware::Next, response::Response};

use crate::database::models::Capability;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Capability gate. Layered after `jwt_auth`; looks the authenticated role up
/// in the capability table and denies with 403 on a miss.
pub async fn require_capability(
    capability: Capability,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    if !auth.role.allows(capability) {
        return Err(ApiError::forbidden("Access denied. Insufficient permissions."));
    }

    Ok(next.run(request).await)
}
