use super::{
    FieldError, Review, ReviewChanges, ReviewDraft, ReviewFilter, ReviewStore, StoreError,
};
use crate::api::pagination::PageWindow;
use crate::config::DatabaseConfig;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// One review per user per movie.
const OWNER_UNIQUE_CONSTRAINT: &str = "reviews_movie_id_user_id_key";

const SELECT_REVIEWS: &str =
    "SELECT id, movie_id, user_id, rating, comment, created_at, updated_at FROM reviews";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    movie_id: String,
    user_id: String,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            movie_id: row.movie_id,
            user_id: row.user_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed review store
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    /// Build the pool without connecting; connections open on first use so the
    /// process can boot (and report not-ready) while the database is down.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database schema up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
    match filter {
        ReviewFilter::All => {}
        ReviewFilter::Movie(movie_id) => {
            builder.push(" WHERE movie_id = ").push_bind(movie_id.clone());
        }
        ReviewFilter::User(user_id) => {
            builder.push(" WHERE user_id = ").push_bind(user_id.clone());
        }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn find_and_count(
        &self,
        filter: &ReviewFilter,
        window: &PageWindow,
    ) -> Result<(u64, Vec<Review>), StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let offset = i64::try_from(window.offset).unwrap_or(i64::MAX);
        let mut select = QueryBuilder::<Postgres>::new(SELECT_REVIEWS);
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(i64::from(window.limit))
            .push(" OFFSET ")
            .push_bind(offset);
        let rows: Vec<ReviewRow> = select.build_query_as().fetch_all(&self.pool).await?;

        debug!(?filter, total, returned = rows.len(), "Listed reviews");
        Ok((
            u64::try_from(total).unwrap_or_default(),
            rows.into_iter().map(Review::from).collect(),
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let row: Option<ReviewRow> = sqlx::query_as(
            "SELECT id, movie_id, user_id, rating, comment, created_at, updated_at \
             FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Review::from))
    }

    async fn create(&self, draft: ReviewDraft) -> Result<Review, StoreError> {
        let review = draft.validate().map_err(StoreError::Validation)?;
        let row: ReviewRow = sqlx::query_as(
            "INSERT INTO reviews (id, movie_id, user_id, rating, comment) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, movie_id, user_id, rating, comment, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&review.movie_id)
        .bind(&review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        existing: &Review,
        changes: ReviewChanges,
    ) -> Result<Review, StoreError> {
        changes.validate().map_err(StoreError::Validation)?;
        let rating = changes.rating.unwrap_or(existing.rating);
        let comment = changes.comment.or_else(|| existing.comment.clone());

        let row: Option<ReviewRow> = sqlx::query_as(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, movie_id, user_id, rating, comment, created_at, updated_at",
        )
        .bind(existing.id)
        .bind(rating)
        .bind(&comment)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::from)
            .ok_or_else(|| StoreError::Other(anyhow!("review {} vanished during update", existing.id)))
    }

    async fn delete(&self, existing: &Review) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(existing.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::PoolTimedOut => Self::Unavailable("connection pool timed out".to_string()),
            E::PoolClosed => Self::Unavailable("connection pool is closed".to_string()),
            E::Io(e) => Self::Unavailable(e.to_string()),
            E::Tls(e) => Self::Unavailable(format!("TLS error: {e}")),
            E::WorkerCrashed => Self::Unavailable("database worker crashed".to_string()),
            E::Database(db_err) if db_err.is_unique_violation() => {
                Self::Validation(unique_violation_fields(db_err.constraint()))
            }
            E::Database(db_err)
                if db_err.is_check_violation() || db_err.is_foreign_key_violation() =>
            {
                debug!(constraint = ?db_err.constraint(), "constraint rejected review");
                Self::Validation(Vec::new())
            }
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

fn unique_violation_fields(constraint: Option<&str>) -> Vec<FieldError> {
    match constraint {
        Some(OWNER_UNIQUE_CONSTRAINT) => vec![FieldError::new(
            "movieId",
            "you have already reviewed this movie",
        )],
        _ => Vec::new(),
    }
}
