// Admin-only user management: filtered listing, CRUD, role assignment.

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::password;
use crate::database::models::{Role, User, UserSummary};
use crate::database::Database;
use crate::error::{is_unique_violation, ApiError};
use crate::extract::{Json, Path, Query};
use crate::query::{FilterClause, ListParams, Pagination, SortKey, SortOrder, UserSortKey};
use crate::validation;

// Owner rows carry the average rating across their stores; other roles get NULL
const STORE_RATING_SELECT: &str = "CASE WHEN u.role = 'store_owner' \
     THEN COALESCE(sr.average_rating, 0) END AS store_rating";

const STORE_RATING_JOIN: &str = "LEFT JOIN (\
       SELECT s.owner_id, ROUND(AVG(r.rating), 2)::float8 AS average_rating \
       FROM stores s LEFT JOIN ratings r ON s.id = r.store_id \
       GROUP BY s.owner_id\
     ) sr ON sr.owner_id = u.id";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
}

impl UserListQuery {
    fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub role: String,
}

fn parse_role(value: &str) -> Result<Role, ApiError> {
    value.parse::<Role>().map_err(|_| ApiError::bad_request("Invalid role specified"))
}

/// GET /api/users
pub async fn list(Query(query): Query<UserListQuery>) -> Result<Json<Value>, ApiError> {
    let params = query.list_params();
    let sort_key = UserSortKey::parse(params.sort_by.as_deref());
    let sort_order = params.sort_order(SortOrder::Asc);

    let mut filter = FilterClause::new();
    if let Some(name) = query.name.as_deref() {
        filter.ilike("u.name", name);
    }
    if let Some(email) = query.email.as_deref() {
        filter.ilike("u.email", email);
    }
    if let Some(address) = query.address.as_deref() {
        filter.ilike("u.address", address);
    }
    if let Some(role) = query.role.as_deref() {
        filter.eq_role("u.role", parse_role(role)?);
    }

    let pool = Database::pool().await?;

    let count_sql = format!("SELECT COUNT(*) FROM users u{}", filter.where_sql());
    let total_count: i64 = filter
        .bind_scalar(sqlx::query_scalar(&count_sql))
        .fetch_one(&pool)
        .await?;

    let list_sql = format!(
        "SELECT u.id, u.name, u.email, u.address, u.role, u.created_at, u.updated_at, {select} \
         FROM users u {join}{where_sql} \
         ORDER BY u.{sort} {order} LIMIT {limit} OFFSET {offset}",
        select = STORE_RATING_SELECT,
        join = STORE_RATING_JOIN,
        where_sql = filter.where_sql(),
        sort = sort_key.column(),
        order = sort_order.as_sql(),
        limit = params.limit(),
        offset = params.offset(),
    );
    let users: Vec<UserSummary> = filter
        .bind_query_as(sqlx::query_as(&list_sql))
        .fetch_all(&pool)
        .await?;

    Ok(Json(json!({
        "users": users,
        "pagination": Pagination::new(&params, total_count)
    })))
}

/// POST /api/users
pub async fn create(Json(payload): Json<CreateUserRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let role = match payload.role.as_deref() {
        Some(r) => parse_role(r)?,
        None => Role::User,
    };
    validation::validate_user_payload(&payload.name, &payload.email, &payload.password, &payload.address)?;

    let pool = Database::pool().await?;
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
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
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("User with this email already exists")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": user
        })),
    ))
}

/// GET /api/users/:id
pub async fn get_by_id(Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let sql = format!(
        "SELECT u.id, u.name, u.email, u.address, u.role, u.created_at, u.updated_at, {select} \
         FROM users u {join} WHERE u.id = $1",
        select = STORE_RATING_SELECT,
        join = STORE_RATING_JOIN,
    );
    let user: Option<UserSummary> = sqlx::query_as(&sql).bind(id).fetch_optional(&pool).await?;

    match user {
        Some(user) => Ok(Json(json!({ "user": user }))),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// PUT /api/users/:id
pub async fn update(
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    let role = parse_role(&payload.role)?;
    validation::validate_user_update(&payload.name, &payload.email, &payload.address)?;

    let pool = Database::pool().await?;
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let email_taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id != $2")
        .bind(&payload.email)
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    if email_taken.is_some() {
        return Err(ApiError::conflict("Email is already taken"));
    }

    let user: User = sqlx::query_as(
        "UPDATE users SET name = $1, email = $2, address = $3, role = $4, updated_at = now() \
         WHERE id = $5 \
         RETURNING id, name, email, password_hash, address, role, created_at, updated_at",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(role)
    .bind(id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Email is already taken")
        } else {
            e.into()
        }
    })?;

    Ok(Json(json!({
        "message": "User updated successfully",
        "user": user
    })))
}

/// DELETE /api/users/:id
pub async fn delete(Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let existing: Option<(Uuid, Role)> = sqlx::query_as("SELECT id, role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let Some((_, role)) = existing else {
        return Err(ApiError::not_found("User not found"));
    };
    if role == Role::Admin {
        return Err(ApiError::forbidden("Cannot delete admin users"));
    }

    // Owned stores and ratings go with the user via ON DELETE CASCADE
    sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&pool).await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
