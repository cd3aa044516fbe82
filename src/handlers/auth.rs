// Authentication handlers: login, registration, profile, password change.

use axum::{http::StatusCode, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, password, Claims};
use crate::database::models::{Role, User};
use crate::database::Database;
use crate::error::{is_unique_violation, ApiError};
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /api/auth/login
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    validation::validate_login(&payload.email, &payload.password)?;

    let pool = Database::pool().await?;
    let user: Option<User> = sqlx::query_as(
        "SELECT id, name, email, password_hash, address, role, created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await?;

    // Same failure for unknown email and bad password
    let Some(user) = user else {
        return Err(ApiError::unauthorized("Invalid credentials"));
    };
    if !password::verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = generate_jwt(&Claims::new(user.id, user.email.clone(), user.role))?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": user
    })))
}

/// POST /api/auth/register
pub async fn register(Json(payload): Json<RegisterRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    validation::validate_user_payload(&payload.name, &payload.email, &payload.password, &payload.address)?;

    let pool = Database::pool().await?;
    let existing: Option<(uuid::Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = password::hash_password(&payload.password)?;

    let user: User = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash, address, role) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, email, password_hash, address, role, created_at, updated_at",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.address)
    .bind(Role::User)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Concurrent registration with the same email loses to the unique index
        if is_unique_violation(&e) {
            ApiError::conflict("User with this email already exists")
        } else {
            e.into()
        }
    })?;

    let token = generate_jwt(&Claims::new(user.id, user.email.clone(), user.role))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "token": token,
            "user": user
        })),
    ))
}

/// GET /api/auth/profile
pub async fn profile(Extension(auth): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let user: Option<User> = sqlx::query_as(
        "SELECT id, name, email, password_hash, address, role, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(auth.id)
    .fetch_optional(&pool)
    .await?;

    match user {
        Some(user) => Ok(Json(json!({ "user": user }))),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// PUT /api/auth/change-password
pub async fn change_password(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    validation::validate_password_change(&payload.current_password, &payload.new_password)?;

    let pool = Database::pool().await?;
    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&pool)
        .await?;

    let Some((current_hash,)) = row else {
        return Err(ApiError::not_found("User not found"));
    };
    if !password::verify_password(&payload.current_password, &current_hash)? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let new_hash = password::hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&new_hash)
        .bind(auth.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}
