pub mod postgres;
pub mod validation;

#[cfg(test)]
pub mod memory;

pub use postgres::PgReviewStore;
pub use validation::FieldError;

use crate::api::pagination::PageWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A stored movie review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub movie_id: String,
    pub user_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated fields for a new review. The owner is always set by the caller.
#[derive(Debug, Clone, Default)]
pub struct ReviewDraft {
    pub movie_id: Option<String>,
    pub user_id: String,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Which reviews a listing query selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewFilter {
    All,
    Movie(String),
    User(String),
}

/// Failures surfaced by a [`ReviewStore`], already classified by the adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid review data ({} field error(s))", .0.len())]
    Validation(Vec<FieldError>),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence collaborator for reviews
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Total matching rows plus one page of them, newest first.
    async fn find_and_count(
        &self,
        filter: &ReviewFilter,
        window: &PageWindow,
    ) -> Result<(u64, Vec<Review>), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, StoreError>;

    async fn create(&self, draft: ReviewDraft) -> Result<Review, StoreError>;

    async fn update(&self, existing: &Review, changes: ReviewChanges)
    -> Result<Review, StoreError>;

    async fn delete(&self, existing: &Review) -> Result<(), StoreError>;

    /// Cheap connectivity probe used by the readiness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
