use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed role enumeration. Stored as TEXT in the users table; authorization
/// decisions go through the capability table instead of comparing strings in
/// handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
    StoreOwner,
}

/// Operations that are gated on role rather than plain authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageUsers,
    CreateStores,
    DeleteStores,
    ViewOwnedStores,
    ViewAllRatings,
    ViewAdminDashboard,
    ViewOwnerDashboard,
    ViewUserDashboard,
    ViewStoreDashboard,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::StoreOwner => "store_owner",
        }
    }

    /// Capability table. Owner-scoped surfaces are deliberately not granted
    /// to admins; admins reach the same data through the admin surfaces.
    pub fn allows(self, capability: Capability) -> bool {
        match capability {
            Capability::ManageUsers
            | Capability::CreateStores
            | Capability::DeleteStores
            | Capability::ViewAllRatings
            | Capability::ViewAdminDashboard => self == Role::Admin,
            Capability::ViewOwnedStores | Capability::ViewOwnerDashboard => self == Role::StoreOwner,
            Capability::ViewUserDashboard => self == Role::User,
            Capability::ViewStoreDashboard => matches!(self, Role::Admin | Role::StoreOwner),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "store_owner" => Ok(Role::StoreOwner),
            other => Err(format!("invalid role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Role travels as TEXT on the wire to and from Postgres.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<Role>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Full user row. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as exposed on the admin listing surface; `store_rating` is attached
/// for store owners only (average across owned stores, 0 when none).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store row with derived aggregates; `user_rating` is the calling user's own
/// rating when the request is authenticated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreWithStats {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub average_rating: f64,
    pub total_ratings: i64,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rating joined with the rater's name (per-store listing)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreRating {
    pub id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
}

/// Caller's own rating joined with store identity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OwnRating {
    pub id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub store_id: Uuid,
    pub store_name: String,
    pub store_address: String,
}

/// Rating joined with both user and store names (admin listing)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminRating {
    pub id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub user_name: String,
    pub store_id: Uuid,
    pub store_name: String,
}

/// Compact recent-activity row for dashboards
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentRating {
    pub id: Uuid,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
    pub store_name: String,
}

/// One bucket of the 1-5 rating histogram
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

/// Histogram bucket scoped to a named store (owner dashboard)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreRatingBucket {
    pub rating: i32,
    pub count: i64,
    pub store_name: String,
}
