// Rating lifecycle and listing surfaces.

use axum::{http::StatusCode, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{AdminRating, OwnRating, Rating, StoreRating};
use crate::database::Database;
use crate::error::{is_unique_violation, ApiError};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::query::{
    AdminRatingSortKey, FilterClause, ListParams, OwnRatingSortKey, Pagination, SortKey, SortOrder,
    StoreRatingSortKey,
};
use crate::validation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub store_id: Uuid,
    pub rating: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl RatingListQuery {
    fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllRatingsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub store_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub rating: Option<i32>,
}

impl AllRatingsQuery {
    fn list_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
        }
    }
}

/// POST /api/ratings
///
/// Insertion leans on the `(user_id, store_id)` unique constraint; a
/// concurrent duplicate submission surfaces as the same 409 without a
/// check-then-insert window.
pub async fn submit(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<RatingRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validation::validate_rating_value(payload.rating)?;

    let pool = Database::pool().await?;
    let store: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE id = $1")
        .bind(payload.store_id)
        .fetch_optional(&pool)
        .await?;
    if store.is_none() {
        return Err(ApiError::not_found("Store not found"));
    }

    let rating: Rating = sqlx::query_as(
        "INSERT INTO ratings (user_id, store_id, rating) \
         VALUES ($1, $2, $3) \
         RETURNING id, user_id, store_id, rating, created_at, updated_at",
    )
    .bind(auth.id)
    .bind(payload.store_id)
    .bind(payload.rating)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("You have already rated this store. Use update rating instead.")
        } else {
            e.into()
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Rating submitted successfully",
            "rating": rating
        })),
    ))
}

/// PUT /api/ratings
pub async fn update(
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<Value>, ApiError> {
    validation::validate_rating_value(payload.rating)?;

    let pool = Database::pool().await?;
    let rating: Option<Rating> = sqlx::query_as(
        "UPDATE ratings SET rating = $1, updated_at = now() \
         WHERE user_id = $2 AND store_id = $3 \
         RETURNING id, user_id, store_id, rating, created_at, updated_at",
    )
    .bind(payload.rating)
    .bind(auth.id)
    .bind(payload.store_id)
    .fetch_optional(&pool)
    .await?;

    match rating {
        Some(rating) => Ok(Json(json!({
            "message": "Rating updated successfully",
            "rating": rating
        }))),
        None => Err(ApiError::not_found("Rating not found. Submit a new rating instead.")),
    }
}

/// DELETE /api/ratings/store/:storeId
pub async fn delete(
    Extension(auth): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;
    let deleted: Option<(Uuid,)> = sqlx::query_as(
        "DELETE FROM ratings WHERE user_id = $1 AND store_id = $2 RETURNING id",
    )
    .bind(auth.id)
    .bind(store_id)
    .fetch_optional(&pool)
    .await?;

    match deleted {
        Some(_) => Ok(Json(json!({ "message": "Rating deleted successfully" }))),
        None => Err(ApiError::not_found("Rating not found")),
    }
}

/// GET /api/ratings/store/:storeId
pub async fn list_by_store(
    Path(store_id): Path<Uuid>,
    Query(query): Query<RatingListQuery>,
) -> Result<Json<Value>, ApiError> {
    let params = query.list_params();
    let sort_key = StoreRatingSortKey::parse(params.sort_by.as_deref());
    let sort_order = params.sort_order(SortOrder::Desc);

    let pool = Database::pool().await?;
    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE store_id = $1")
        .bind(store_id)
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT r.id, r.rating, r.created_at, r.updated_at, u.name AS user_name \
         FROM ratings r JOIN users u ON r.user_id = u.id \
         WHERE r.store_id = $1 \
         ORDER BY {sort} {order} LIMIT {limit} OFFSET {offset}",
        sort = sort_key.column(),
        order = sort_order.as_sql(),
        limit = params.limit(),
        offset = params.offset(),
    );
    let ratings: Vec<StoreRating> = sqlx::query_as(&sql).bind(store_id).fetch_all(&pool).await?;

    Ok(Json(json!({
        "ratings": ratings,
        "pagination": Pagination::new(&params, total_count)
    })))
}

/// GET /api/ratings/my-ratings
pub async fn list_mine(
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<RatingListQuery>,
) -> Result<Json<Value>, ApiError> {
    let params = query.list_params();
    let sort_key = OwnRatingSortKey::parse(params.sort_by.as_deref());
    let sort_order = params.sort_order(SortOrder::Desc);

    let pool = Database::pool().await?;
    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE user_id = $1")
        .bind(auth.id)
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT r.id, r.rating, r.created_at, r.updated_at, \
                s.id AS store_id, s.name AS store_name, s.address AS store_address \
         FROM ratings r JOIN stores s ON r.store_id = s.id \
         WHERE r.user_id = $1 \
         ORDER BY {sort} {order} LIMIT {limit} OFFSET {offset}",
        sort = sort_key.column(),
        order = sort_order.as_sql(),
        limit = params.limit(),
        offset = params.offset(),
    );
    let ratings: Vec<OwnRating> = sqlx::query_as(&sql).bind(auth.id).fetch_all(&pool).await?;

    Ok(Json(json!({
        "ratings": ratings,
        "pagination": Pagination::new(&params, total_count)
    })))
}

/// GET /api/ratings/all - admin listing with conjunctive filters
pub async fn list_all(Query(query): Query<AllRatingsQuery>) -> Result<Json<Value>, ApiError> {
    let params = query.list_params();
    let sort_key = AdminRatingSortKey::parse(params.sort_by.as_deref());
    let sort_order = params.sort_order(SortOrder::Desc);

    let mut filter = FilterClause::new();
    if let Some(store_id) = query.store_id {
        filter.eq_id("r.store_id", store_id);
    }
    if let Some(user_id) = query.user_id {
        filter.eq_id("r.user_id", user_id);
    }
    if let Some(rating) = query.rating {
        filter.eq_int("r.rating", rating);
    }

    let pool = Database::pool().await?;
    let count_sql = format!("SELECT COUNT(*) FROM ratings r{}", filter.where_sql());
    let total_count: i64 = filter
        .bind_scalar(sqlx::query_scalar(&count_sql))
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        "SELECT r.id, r.rating, r.created_at, r.updated_at, \
                u.id AS user_id, u.name AS user_name, \
                s.id AS store_id, s.name AS store_name \
         FROM ratings r \
         JOIN users u ON r.user_id = u.id \
         JOIN stores s ON r.store_id = s.id \
         {where_sql} \
         ORDER BY {sort} {order} LIMIT {limit} OFFSET {offset}",
        where_sql = filter.where_sql(),
        sort = sort_key.column(),
        order = sort_order.as_sql(),
        limit = params.limit(),
        offset = params.offset(),
    );
    let ratings: Vec<AdminRating> = filter
        .bind_query_as(sqlx::query_as(&sql))
        .fetch_all(&pool)
        .await?;

    Ok(Json(json!({
        "ratings": ratings,
        "pagination": Pagination::new(&params, total_count)
    })))
}
