//! `PostgreSQL` review repository for the review search service.
//!
//! This crate provides [`PostgresReviewRepository`], which implements the
//! [`ReviewRepository`] trait from `review-search-core` with sqlx. Titles are
//! matched by case-insensitive substring; the search fragment is bound as a
//! parameter, never interpolated into the query.
//!
//! # Example
//!
//! ```no_run
//! use review_search_core::repository::ReviewRepository;
//! use review_search_postgres::PostgresReviewRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = PostgresReviewRepository::connect("postgres://localhost/reviews", 10).await?;
//! repository.migrate().await?;
//!
//! let reviews = repository.find_by_title("dune").await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use review_search_core::repository::{RepositoryError, ReviewRepository};
use review_search_core::review::Review;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;

/// Review storage backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DatabaseError`] if the pool cannot connect.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                RepositoryError::DatabaseError(format!("Failed to connect to database: {e}"))
            })?;
        tracing::info!(max_connections, "Connected to review database");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(format!("Migration failed: {e}")))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_row(row: &PgRow) -> Result<Review, RepositoryError> {
    let mapping = |e: sqlx::Error| RepositoryError::MappingError(e.to_string());
    Ok(Review {
        id: row.try_get("id").map_err(mapping)?,
        title: row.try_get("title").map_err(mapping)?,
        description: row.try_get("description").map_err(mapping)?,
        user_fk: row.try_get("user_fk").map_err(mapping)?,
        media_fk: row.try_get("media_fk").map_err(mapping)?,
    })
}

/// Escape `LIKE` metacharacters so the fragment matches literally.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl ReviewRepository for PostgresReviewRepository {
    fn find_by_title(
        &self,
        fragment: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>, RepositoryError>> + Send + '_>> {
        let pattern = escape_like(fragment);
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id::BIGINT AS id, title, description,
                       user_fk::BIGINT AS user_fk, media_fk::BIGINT AS media_fk
                FROM reviews
                WHERE title ILIKE '%' || $1 || '%'
                ORDER BY id
                ",
            )
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Review query failed");
                RepositoryError::DatabaseError(e.to_string())
            })?;

            metrics::counter!("review_repository_queries_total").increment(1);
            tracing::debug!(rows = rows.len(), "Review query returned");

            rows.iter().map(map_row).collect()
        })
    }
}
