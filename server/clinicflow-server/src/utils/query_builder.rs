//! Query builder utilities for consistent SQL query construction
//!
//! Eliminates duplication in filtered, ordered, paginated list queries
//! across handlers.

use sqlx::query::QueryAs;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Paginated query builder for consistent query construction
///
/// ```rust,ignore
/// let mut query = PaginatedQuery::new("SELECT * FROM encounters WHERE 1=1");
/// query
///     .filter_institution(ctx.institution_id)
///     .filter_eq("status", params.status.map(|s| s.as_str().to_owned()))
///     .order_by("scheduled_date", "DESC")
///     .paginate(params.pagination.page, params.pagination.page_size);
/// let rows: Vec<EncounterRow> = query.build_query_as().fetch_all(&pool).await?;
/// ```
pub struct PaginatedQuery<'a> {
    query: QueryBuilder<'a, Postgres>,
    page: u32,
    page_size: u32,
}

impl<'a> PaginatedQuery<'a> {
    /// Create a new paginated query builder
    pub fn new(base_query: &'static str) -> Self {
        Self { query: QueryBuilder::new(base_query), page: 1, page_size: 20 }
    }

    /// Add an equality filter (only if value is Some)
    pub fn filter_eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + Sync + 'static,
    {
        if let Some(val) = value {
            self.query.push(format!(" AND {} = ", column));
            self.query.push_bind(val);
        }
        self
    }

    /// Filter by institution_id (every list endpoint is institution-scoped)
    pub fn filter_institution(&mut self, institution_id: Uuid) -> &mut Self {
        self.query.push(" AND institution_id = ");
        self.query.push_bind(institution_id);
        self
    }

    /// Add ORDER BY clause
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        self.query.push(format!(" ORDER BY {} {}", column, direction));
        self
    }

    /// Apply pagination
    pub fn paginate(&mut self, page: Option<u32>, page_size: Option<u32>) -> &mut Self {
        self.page = page.unwrap_or(1).max(1);
        self.page_size = page_size.unwrap_or(20).clamp(1, 100);
        let offset = (self.page - 1) * self.page_size;
        self.query.push(" LIMIT ");
        self.query.push_bind(self.page_size as i64);
        self.query.push(" OFFSET ");
        self.query.push_bind(offset as i64);
        self
    }

    /// Build the final query as a typed query for fetching specific types
    pub fn build_query_as<T>(&mut self) -> QueryAs<'_, Postgres, T, sqlx::postgres::PgArguments>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        self.query.build_query_as()
    }

    /// Get current page
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Get current page size
    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chaining_filters() {
        let mut query = PaginatedQuery::new("SELECT * FROM encounters WHERE 1=1");
        query
            .filter_institution(Uuid::new_v4())
            .filter_eq("status", Some("arrived"))
            .filter_eq("patient_id", None::<Uuid>)
            .order_by("created_at", "DESC")
            .paginate(Some(2), Some(25));

        assert_eq!(query.page(), 2);
        assert_eq!(query.page_size(), 25);
    }

    #[test]
    fn test_paginate_clamps() {
        let mut query = PaginatedQuery::new("SELECT * FROM encounters WHERE 1=1");
        query.paginate(Some(0), Some(500));
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 100);
    }
}
