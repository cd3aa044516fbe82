// Store management: browsing with aggregates, admin CRUD, owner listing.

use axum::{http::StatusCode, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Role, Store, StoreWithStats};
use crate::database::Database;
use crate::error::{is_unique_violation, ApiError};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::query::{FilterClause, ListParams, Pagination, SortKey, SortOrder, StoreSortKey};
use crate::validation;

const STORE_STATS_COLUMNS: &str = "s.id, s.name, s.email, s.address, s.owner_id, s.created_at, \
     ROUND(COALESCE(AVG(r.rating), 0), 1)::float8 AS average_rating, \
     COUNT(r.id) AS total_ratings";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub search: Option<String>,
}

impl StoreListQuery {
    fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }

    fn filter(&self) -> FilterClause {
        let mut filter = FilterClause::new();
        // `search` spans both fields and wins over the individual filters
        if let Some(search) = self.search.as_deref() {
            filter.ilike_any(&["s.name", "s.address"], search);
        } else {
            if let Some(name) = self.name.as_deref() {
                filter.ilike("s.name", name);
            }
            if let Some(address) = self.address.as_deref() {
                filter.ilike("s.address", address);
            }
        }
        filter
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
}

/// GET /api/stores
pub async fn list(
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<StoreListQuery>,
) -> Result<Json<Value>, ApiError> {
    let params = query.list_params();
    let sort_key = StoreSortKey::parse(params.sort_by.as_deref());
    let sort_order = params.sort_order(SortOrder::Asc);
    let filter = query.filter();

    let pool = Database::pool().await?;

    let count_sql = format!("SELECT COUNT(DISTINCT s.id) FROM stores s{}", filter.where_sql());
    let total_count: i64 = filter
        .bind_scalar(sqlx::query_scalar(&count_sql))
        .fetch_one(&pool)
        .await?;

    // The caller's own rating rides along as a second LEFT JOIN; its bind
    // comes after the filter parameters.
    let user_param = filter.params().len() + 1;
    let list_sql = format!(
        "SELECT {columns}, my.rating AS user_rating \
         FROM stores s \
         LEFT JOIN ratings r ON s.id = r.store_id \
         LEFT JOIN ratings my ON my.store_id = s.id AND my.user_id = ${user_param} \
         {where_sql} \
         GROUP BY s.id, s.name, s.email, s.address, s.owner_id, s.created_at, my.rating \
         ORDER BY {sort} {order} LIMIT {limit} OFFSET {offset}",
        columns = STORE_STATS_COLUMNS,
        user_param = user_param,
        where_sql = filter.where_sql(),
        sort = sort_key.column(),
        order = sort_order.as_sql(),
        limit = params.limit(),
        offset = params.offset(),
    );
    let stores: Vec<StoreWithStats> = filter
        .bind_query_as(sqlx::query_as(&list_sql))
        .bind(auth.id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(json!({
        "stores": stores,
        "pagination": Pagination::new(&params, total_count)
    })))
}

/// GET /api/stores/my-stores
pub async fn list_mine(Extension(auth): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let sql = format!(
        "SELECT {columns} FROM stores s \
         LEFT JOIN ratings r ON s.id = r.store_id \
         WHERE s.owner_id = $1 \
         GROUP BY s.id, s.name, s.email, s.address, s.owner_id, s.created_at \
         ORDER BY s.name",
        columns = STORE_STATS_COLUMNS,
    );
    let stores: Vec<StoreWithStats> = sqlx::query_as(&sql).bind(auth.id).fetch_all(&pool).await?;

    Ok(Json(json!({ "stores": stores })))
}

/// POST /api/stores
pub async fn create(Json(payload): Json<CreateStoreRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    validation::validate_store_payload(&payload.name, &payload.email, &payload.address)?;

    let pool = Database::pool().await?;
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Store with this email already exists"));
    }

    let owner: Option<(Uuid, Role)> = sqlx::query_as("SELECT id, role FROM users WHERE id = $1")
        .bind(payload.owner_id)
        .fetch_optional(&pool)
        .await?;
    let Some((owner_id, owner_role)) = owner else {
        return Err(ApiError::bad_request("Owner not found"));
    };

    // Designating a user as owner promotes them
    if owner_role != Role::StoreOwner {
        sqlx::query("UPDATE users SET role = $1, updated_at = now() WHERE id = $2")
            .bind(Role::StoreOwner)
            .bind(owner_id)
            .execute(&pool)
            .await?;
    }

    let store: Store = sqlx::query_as(
        "INSERT INTO stores (name, email, address, owner_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, name, email, address, owner_id, created_at, updated_at",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(owner_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("Store with this email already exists")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Store created successfully",
            "store": store
        })),
    ))
}

/// GET /api/stores/:id
pub async fn get_by_id(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let sql = format!(
        "SELECT {columns}, my.rating AS user_rating \
         FROM stores s \
         LEFT JOIN ratings r ON s.id = r.store_id \
         LEFT JOIN ratings my ON my.store_id = s.id AND my.user_id = $2 \
         WHERE s.id = $1 \
         GROUP BY s.id, s.name, s.email, s.address, s.owner_id, s.created_at, my.rating",
        columns = STORE_STATS_COLUMNS,
    );
    let store: Option<StoreWithStats> = sqlx::query_as(&sql)
        .bind(id)
        .bind(auth.id)
        .fetch_optional(&pool)
        .await?;

    match store {
        Some(store) => Ok(Json(json!({ "store": store }))),
        None => Err(ApiError::not_found("Store not found")),
    }
}

/// PUT /api/stores/:id - admin, or the store's owner
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoreRequest>,
) -> Result<Json<Value>, ApiError> {
    validation::validate_store_payload(&payload.name, &payload.email, &payload.address)?;

    let pool = Database::pool().await?;
    let existing: Option<(Uuid, Uuid)> = sqlx::query_as("SELECT id, owner_id FROM stores WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    let Some((_, owner_id)) = existing else {
        return Err(ApiError::not_found("Store not found"));
    };

    if auth.role != Role::Admin {
        if auth.role != Role::StoreOwner {
            return Err(ApiError::forbidden("Store owner access required"));
        }
        if owner_id != auth.id {
            return Err(ApiError::forbidden("Access denied. You can only access your own store."));
        }
    }

    let email_taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE email = $1 AND id != $2")
        .bind(&payload.email)
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    if email_taken.is_some() {
        return Err(ApiError::conflict("Email is already taken"));
    }

    let store: Store = sqlx::query_as(
        "UPDATE stores SET name = $1, email = $2, address = $3, updated_at = now() \
         WHERE id = $4 \
         RETURNING id, name, email, address, owner_id, created_at, updated_at",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.address)
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
        "message": "Store updated successfully",
        "store": store
    })))
}

/// DELETE /api/stores/:id
pub async fn delete(Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::not_found("Store not found"));
    }

    // Ratings cascade with the store
    sqlx::query("DELETE FROM stores WHERE id = $1").bind(id).execute(&pool).await?;

    Ok(Json(json!({ "message": "Store deleted successfully" })))
}
