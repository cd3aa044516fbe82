//! Typed list-query building: pagination, sort allow-lists, and conjunctive
//! filters. Every sortable column and filter predicate is a statically known
//! SQL fragment; client strings are only ever bound as parameters.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::FromRow;
use uuid::Uuid;

use crate::config;
use crate::database::models::Role;

/// Common list-endpoint query parameters (`?page=2&limit=10&sortBy=name&sortOrder=desc`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListParams {
    /// 1-indexed page, floored at 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to 1..=max_page_size
    pub fn limit(&self) -> i64 {
        let api = &config::config().api;
        self.limit.unwrap_or(api.default_page_size).clamp(1, api.max_page_size)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn sort_order(&self, default: SortOrder) -> SortOrder {
        SortOrder::parse(self.sort_order.as_deref(), default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Unrecognized values fall back to the resource default, never an error
    pub fn parse(value: Option<&str>, default: SortOrder) -> SortOrder {
        match value {
            Some(v) if v.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => default,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A sortable column set for one list endpoint. `parse` maps the client's
/// `sortBy` onto the allow-list, falling back to the endpoint default.
pub trait SortKey: Copy {
    fn parse(value: Option<&str>) -> Self;
    fn column(self) -> &'static str;
}

macro_rules! sort_key {
    ($name:ident, $default:ident, { $($variant:ident => ($key:literal, $column:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl SortKey for $name {
            fn parse(value: Option<&str>) -> Self {
                match value {
                    $(Some(v) if v == $key => $name::$variant,)+
                    _ => $name::$default,
                }
            }

            fn column(self) -> &'static str {
                match self {
                    $($name::$variant => $column),+
                }
            }
        }
    };
}

sort_key!(UserSortKey, Name, {
    Name => ("name", "name"),
    Email => ("email", "email"),
    Role => ("role", "role"),
    CreatedAt => ("created_at", "created_at"),
});

sort_key!(StoreSortKey, Name, {
    Name => ("name", "s.name"),
    Address => ("address", "s.address"),
    AverageRating => ("average_rating", "average_rating"),
    CreatedAt => ("created_at", "s.created_at"),
});

sort_key!(StoreRatingSortKey, CreatedAt, {
    Rating => ("rating", "r.rating"),
    CreatedAt => ("created_at", "r.created_at"),
});

sort_key!(OwnRatingSortKey, CreatedAt, {
    Rating => ("rating", "r.rating"),
    CreatedAt => ("created_at", "r.created_at"),
    StoreName => ("store_name", "s.name"),
});

sort_key!(AdminRatingSortKey, CreatedAt, {
    Rating => ("rating", "r.rating"),
    CreatedAt => ("created_at", "r.created_at"),
    UserName => ("user_name", "u.name"),
    StoreName => ("store_name", "s.name"),
});

/// Values bound into a filter; one variant per column type we filter on
#[derive(Debug, Clone)]
pub enum FilterValue {
    Text(String),
    Int(i32),
    Id(Uuid),
    Role(Role),
}

/// Conjunctive WHERE-clause builder with numbered placeholders. Columns are
/// compile-time constants supplied by the handlers; only values are bound.
#[derive(Debug, Default)]
pub struct FilterClause {
    conditions: Vec<String>,
    params: Vec<FilterValue>,
}

impl FilterClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match
    pub fn ilike(&mut self, column: &'static str, needle: &str) -> &mut Self {
        self.params.push(FilterValue::Text(format!("%{}%", needle)));
        self.conditions.push(format!("{} ILIKE ${}", column, self.params.len()));
        self
    }

    /// Substring match against any of several columns (single bound value)
    pub fn ilike_any(&mut self, columns: &[&'static str], needle: &str) -> &mut Self {
        self.params.push(FilterValue::Text(format!("%{}%", needle)));
        let n = self.params.len();
        let alternatives: Vec<String> = columns.iter().map(|c| format!("{} ILIKE ${}", c, n)).collect();
        self.conditions.push(format!("({})", alternatives.join(" OR ")));
        self
    }

    pub fn eq_role(&mut self, column: &'static str, role: Role) -> &mut Self {
        self.params.push(FilterValue::Role(role));
        self.conditions.push(format!("{} = ${}", column, self.params.len()));
        self
    }

    pub fn eq_id(&mut self, column: &'static str, id: Uuid) -> &mut Self {
        self.params.push(FilterValue::Id(id));
        self.conditions.push(format!("{} = ${}", column, self.params.len()));
        self
    }

    pub fn eq_int(&mut self, column: &'static str, value: i32) -> &mut Self {
        self.params.push(FilterValue::Int(value));
        self.conditions.push(format!("{} = ${}", column, self.params.len()));
        self
    }

    /// ` WHERE a AND b` (leading space), or empty when no conditions
    pub fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    pub fn bind_query_as<'q, T>(
        &'q self,
        mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>
    where
        T: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
    {
        for p in &self.params {
            q = match p {
                FilterValue::Text(s) => q.bind(s),
                FilterValue::Int(i) => q.bind(*i),
                FilterValue::Id(id) => q.bind(*id),
                FilterValue::Role(r) => q.bind(r.as_str()),
            };
        }
        q
    }

    pub fn bind_scalar<'q, T>(
        &'q self,
        mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, T, PgArguments>,
    ) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, T, PgArguments> {
        for p in &self.params {
            q = match p {
                FilterValue::Text(s) => q.bind(s),
                FilterValue::Int(i) => q.bind(*i),
                FilterValue::Id(id) => q.bind(*id),
                FilterValue::Role(r) => q.bind(r.as_str()),
            };
        }
        q
    }
}

/// List-endpoint pagination envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(params: &ListParams, total_count: i64) -> Self {
        let limit = params.limit();
        Self {
            current_page: params.page(),
            total_pages: (total_count + limit - 1) / limit,
            total_count,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, limit: Option<i64>) -> ListParams {
        ListParams { page, limit, sort_by: None, sort_order: None }
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let p = Pagination::new(&params(Some(2), Some(10)), 25);
        assert_eq!(p.current_page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.total_count, 25);
        assert_eq!(p.limit, 10);
    }

    #[test]
    fn page_and_limit_are_clamped() {
        let p = params(Some(0), Some(0));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 1);
        assert_eq!(params(Some(-3), Some(10_000)).limit(), 100);
        assert_eq!(params(None, None).limit(), 10);
    }

    #[test]
    fn offset_is_derived_from_page_and_limit() {
        assert_eq!(params(Some(3), Some(10)).offset(), 20);
        assert_eq!(params(None, None).offset(), 0);
    }

    #[test]
    fn sort_keys_fall_back_to_default() {
        assert_eq!(UserSortKey::parse(Some("email")).column(), "email");
        assert_eq!(UserSortKey::parse(Some("password_hash")).column(), "name");
        assert_eq!(StoreSortKey::parse(Some("average_rating")).column(), "average_rating");
        assert_eq!(AdminRatingSortKey::parse(None).column(), "r.created_at");
        assert_eq!(OwnRatingSortKey::parse(Some("store_name")).column(), "s.name");
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!(SortOrder::parse(Some("DESC"), SortOrder::Asc), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("sideways"), SortOrder::Desc), SortOrder::Desc);
        assert_eq!(SortOrder::parse(None, SortOrder::Asc), SortOrder::Asc);
    }

    #[test]
    fn filter_clause_numbers_placeholders() {
        let mut f = FilterClause::new();
        f.ilike("name", "alice").eq_role("role", Role::StoreOwner);
        assert_eq!(f.where_sql(), " WHERE name ILIKE $1 AND role = $2");
        assert_eq!(f.params().len(), 2);
    }

    #[test]
    fn ilike_any_binds_one_value() {
        let mut f = FilterClause::new();
        f.ilike_any(&["s.name", "s.address"], "market");
        assert_eq!(f.where_sql(), " WHERE (s.name ILIKE $1 OR s.address ILIKE $1)");
        assert_eq!(f.params().len(), 1);
    }

    #[test]
    fn empty_filter_produces_no_where() {
        assert_eq!(FilterClause::new().where_sql(), "");
    }
}
