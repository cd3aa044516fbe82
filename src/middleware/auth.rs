use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{verify_jwt, JwtError};
use crate::database::models::Role;
use crate::database::Database;
use crate::error::ApiError;

/// Authenticated user context. Built from the JWT claims, then confirmed
/// against the users table so tokens for deleted accounts stop working.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// JWT authentication middleware: validates the bearer token, re-fetches the
/// user row, and injects `AuthUser` into request extensions.
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = verify_jwt(&token).map_err(|e| match e {
        JwtError::TokenExpired => ApiError::unauthorized("Token expired"),
        JwtError::InvalidSecret => {
            tracing::error!("JWT secret not configured");
            ApiError::internal_server_error("Internal server error")
        }
        _ => ApiError::unauthorized("Invalid token"),
    })?;

    // Stale-token defense: the account may have been deleted since issuance
    let pool = Database::pool().await?;
    let user: Option<(Uuid, String, Role)> =
        sqlx::query_as("SELECT id, email, role FROM users WHERE id = $1")
            .bind(claims.user_id)
            .fetch_optional(&pool)
            .await?;

    let Some((id, email, role)) = user else {
        return Err(ApiError::unauthorized("User not found"));
    };

    request.extensions_mut().insert(AuthUser { id, email, role });
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err(ApiError::unauthorized("Access token required")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}
