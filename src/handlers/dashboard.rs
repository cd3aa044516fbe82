// Role-specific dashboards: aggregate statistics per surface.

use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::models::{RatingBucket, RecentRating, Role, StoreRatingBucket, StoreWithStats};
use crate::database::Database;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;

#[derive(Debug, FromRow)]
struct AdminCounts {
    total_users: i64,
    total_stores: i64,
    total_ratings: i64,
    average_rating: f64,
    total_admins: i64,
    total_normal_users: i64,
    total_store_owners: i64,
}

#[derive(Debug, Serialize, FromRow)]
struct TopStore {
    id: Uuid,
    name: String,
    address: String,
    average_rating: f64,
    total_ratings: i64,
}

#[derive(Debug, FromRow)]
struct OwnerTotals {
    total_stores: i64,
    total_ratings: i64,
    overall_average_rating: f64,
}

#[derive(Debug, Serialize, FromRow)]
struct StoreDetail {
    id: Uuid,
    name: String,
    email: String,
    address: String,
    created_at: DateTime<Utc>,
    owner_name: String,
    average_rating: f64,
    total_ratings: i64,
}

#[derive(Debug, Serialize, FromRow)]
struct StoreRatingDetail {
    id: Uuid,
    rating: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
struct MonthlyTrend {
    month: DateTime<Utc>,
    rating_count: i64,
    average_rating: f64,
}

#[derive(Debug, Serialize, FromRow)]
struct RecentUserRating {
    id: Uuid,
    rating: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    store_name: String,
    store_address: String,
}

#[derive(Debug, FromRow)]
struct UserTotals {
    total_ratings: i64,
    average_rating_given: f64,
    lowest_rating_given: Option<i32>,
    highest_rating_given: Option<i32>,
}

/// GET /api/dashboard/admin
pub async fn admin_stats() -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let counts: AdminCounts = sqlx::query_as(
        "SELECT \
           (SELECT COUNT(*) FROM users) AS total_users, \
           (SELECT COUNT(*) FROM stores) AS total_stores, \
           (SELECT COUNT(*) FROM ratings) AS total_ratings, \
           (SELECT ROUND(COALESCE(AVG(rating), 0), 2)::float8 FROM ratings) AS average_rating, \
           (SELECT COUNT(*) FROM users WHERE role = 'admin') AS total_admins, \
           (SELECT COUNT(*) FROM users WHERE role = 'user') AS total_normal_users, \
           (SELECT COUNT(*) FROM users WHERE role = 'store_owner') AS total_store_owners",
    )
    .fetch_one(&pool)
    .await?;

    let top_stores: Vec<TopStore> = sqlx::query_as(
        "SELECT s.id, s.name, s.address, \
                ROUND(COALESCE(AVG(r.rating), 0), 1)::float8 AS average_rating, \
                COUNT(r.id) AS total_ratings \
         FROM stores s LEFT JOIN ratings r ON s.id = r.store_id \
         GROUP BY s.id, s.name, s.address \
         ORDER BY average_rating DESC, total_ratings DESC \
         LIMIT 5",
    )
    .fetch_all(&pool)
    .await?;

    let recent_ratings: Vec<RecentRating> = sqlx::query_as(
        "SELECT r.id, r.rating, r.created_at, u.name AS user_name, s.name AS store_name \
         FROM ratings r \
         JOIN users u ON r.user_id = u.id \
         JOIN stores s ON r.store_id = s.id \
         ORDER BY r.created_at DESC \
         LIMIT 10",
    )
    .fetch_all(&pool)
    .await?;

    let distribution: Vec<RatingBucket> = sqlx::query_as(
        "SELECT rating, COUNT(*) AS count FROM ratings GROUP BY rating ORDER BY rating",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "totalUsers": counts.total_users,
        "totalStores": counts.total_stores,
        "totalRatings": counts.total_ratings,
        "averageRating": counts.average_rating,
        "userBreakdown": {
            "admins": counts.total_admins,
            "normalUsers": counts.total_normal_users,
            "storeOwners": counts.total_store_owners
        },
        "topStores": top_stores,
        "recentRatings": recent_ratings,
        "ratingDistribution": distribution
    })))
}

/// GET /api/dashboard/store-owner
pub async fn store_owner_stats(Extension(auth): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let stores: Vec<StoreWithStats> = sqlx::query_as(
        "SELECT s.id, s.name, s.email, s.address, s.owner_id, s.created_at, \
                ROUND(COALESCE(AVG(r.rating), 0), 1)::float8 AS average_rating, \
                COUNT(r.id) AS total_ratings \
         FROM stores s LEFT JOIN ratings r ON s.id = r.store_id \
         WHERE s.owner_id = $1 \
         GROUP BY s.id, s.name, s.email, s.address, s.owner_id, s.created_at \
         ORDER BY s.name",
    )
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    // An owner with no stores yet gets the zeroed shape rather than an error
    if stores.is_empty() {
        return Ok(Json(json!({
            "stores": [],
            "totalStores": 0,
            "totalRatings": 0,
            "overallAverageRating": 0,
            "recentRatings": []
        })));
    }

    let totals: OwnerTotals = sqlx::query_as(
        "SELECT COUNT(DISTINCT s.id) AS total_stores, \
                COUNT(r.id) AS total_ratings, \
                ROUND(COALESCE(AVG(r.rating), 0), 2)::float8 AS overall_average_rating \
         FROM stores s LEFT JOIN ratings r ON s.id = r.store_id \
         WHERE s.owner_id = $1",
    )
    .bind(auth.id)
    .fetch_one(&pool)
    .await?;

    let recent_ratings: Vec<RecentRating> = sqlx::query_as(
        "SELECT r.id, r.rating, r.created_at, u.name AS user_name, s.name AS store_name \
         FROM ratings r \
         JOIN users u ON r.user_id = u.id \
         JOIN stores s ON r.store_id = s.id \
         WHERE s.owner_id = $1 \
         ORDER BY r.created_at DESC \
         LIMIT 20",
    )
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    let distribution: Vec<StoreRatingBucket> = sqlx::query_as(
        "SELECT r.rating, COUNT(*) AS count, s.name AS store_name \
         FROM ratings r JOIN stores s ON r.store_id = s.id \
         WHERE s.owner_id = $1 \
         GROUP BY r.rating, s.name \
         ORDER BY s.name, r.rating",
    )
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "stores": stores,
        "totalStores": totals.total_stores,
        "totalRatings": totals.total_ratings,
        "overallAverageRating": totals.overall_average_rating,
        "recentRatings": recent_ratings,
        "ratingDistribution": distribution
    })))
}

/// GET /api/dashboard/store/:storeId - admins, or the store's own owner
pub async fn store_stats(
    Extension(auth): Extension<AuthUser>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    if auth.role != Role::Admin {
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM stores WHERE id = $1 AND owner_id = $2")
                .bind(store_id)
                .bind(auth.id)
                .fetch_optional(&pool)
                .await?;
        if owned.is_none() {
            return Err(ApiError::forbidden("Access denied to this store"));
        }
    }

    let store: Option<StoreDetail> = sqlx::query_as(
        "SELECT s.id, s.name, s.email, s.address, s.created_at, u.name AS owner_name, \
                ROUND(COALESCE(AVG(r.rating), 0), 1)::float8 AS average_rating, \
                COUNT(r.id) AS total_ratings \
         FROM stores s \
         JOIN users u ON s.owner_id = u.id \
         LEFT JOIN ratings r ON s.id = r.store_id \
         WHERE s.id = $1 \
         GROUP BY s.id, s.name, s.email, s.address, s.created_at, u.name",
    )
    .bind(store_id)
    .fetch_optional(&pool)
    .await?;

    let Some(store) = store else {
        return Err(ApiError::not_found("Store not found"));
    };

    let ratings: Vec<StoreRatingDetail> = sqlx::query_as(
        "SELECT r.id, r.rating, r.created_at, r.updated_at, \
                u.name AS user_name, u.email AS user_email \
         FROM ratings r JOIN users u ON r.user_id = u.id \
         WHERE r.store_id = $1 \
         ORDER BY r.created_at DESC",
    )
    .bind(store_id)
    .fetch_all(&pool)
    .await?;

    let distribution: Vec<RatingBucket> = sqlx::query_as(
        "SELECT rating, COUNT(*) AS count FROM ratings \
         WHERE store_id = $1 \
         GROUP BY rating ORDER BY rating",
    )
    .bind(store_id)
    .fetch_all(&pool)
    .await?;

    let monthly_trends: Vec<MonthlyTrend> = sqlx::query_as(
        "SELECT DATE_TRUNC('month', created_at) AS month, \
                COUNT(*) AS rating_count, \
                ROUND(AVG(rating), 2)::float8 AS average_rating \
         FROM ratings \
         WHERE store_id = $1 \
           AND created_at >= CURRENT_DATE - INTERVAL '12 months' \
         GROUP BY DATE_TRUNC('month', created_at) \
         ORDER BY month",
    )
    .bind(store_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "store": store,
        "ratings": ratings,
        "ratingDistribution": distribution,
        "monthlyTrends": monthly_trends
    })))
}

/// GET /api/dashboard/user
pub async fn user_stats(Extension(auth): Extension<AuthUser>) -> Result<Json<Value>, ApiError> {
    let pool = Database::pool().await?;

    let totals: UserTotals = sqlx::query_as(
        "SELECT COUNT(r.id) AS total_ratings, \
                ROUND(COALESCE(AVG(r.rating), 0), 2)::float8 AS average_rating_given, \
                MIN(r.rating) AS lowest_rating_given, \
                MAX(r.rating) AS highest_rating_given \
         FROM ratings r WHERE r.user_id = $1",
    )
    .bind(auth.id)
    .fetch_one(&pool)
    .await?;

    let recent_ratings: Vec<RecentUserRating> = sqlx::query_as(
        "SELECT r.id, r.rating, r.created_at, r.updated_at, \
                s.name AS store_name, s.address AS store_address \
         FROM ratings r JOIN stores s ON r.store_id = s.id \
         WHERE r.user_id = $1 \
         ORDER BY r.created_at DESC \
         LIMIT 10",
    )
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    let distribution: Vec<RatingBucket> = sqlx::query_as(
        "SELECT rating, COUNT(*) AS count FROM ratings \
         WHERE user_id = $1 \
         GROUP BY rating ORDER BY rating",
    )
    .bind(auth.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "totalRatings": totals.total_ratings,
        "averageRatingGiven": totals.average_rating_given,
        "lowestRatingGiven": totals.lowest_rating_given,
        "highestRatingGiven": totals.highest_rating_given,
        "recentRatings": recent_ratings,
        "ratingDistribution": distribution
    })))
}
