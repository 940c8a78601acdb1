//! In-memory [`ReviewStore`] double for handler tests.

use super::{FieldError, Review, ReviewChanges, ReviewDraft, ReviewFilter, ReviewStore, StoreError};
use crate::api::pagination::PageWindow;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryReviewStore {
    reviews: Mutex<Vec<Review>>,
    unavailable: AtomicBool,
    broken: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every call fail with an unexpected (unclassified) error.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    /// Number of successful create/update/delete calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Insert a review directly, bypassing validation; later seeds sort newer.
    pub fn seed(&self, movie_id: &str, user_id: &str, rating: i32) -> Review {
        let mut reviews = self.reviews.lock().unwrap();
        let created_at = Utc::now() + Duration::seconds(reviews.len() as i64);
        let review = Review {
            id: Uuid::new_v4(),
            movie_id: movie_id.to_string(),
            user_id: user_id.to_string(),
            rating,
            comment: None,
            created_at,
            updated_at: created_at,
        };
        reviews.push(review.clone());
        review
    }

    pub fn get(&self, id: Uuid) -> Option<Review> {
        self.reviews.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Other(anyhow::anyhow!(
                "relation \"reviews\" does not exist"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn find_and_count(
        &self,
        filter: &ReviewFilter,
        window: &PageWindow,
    ) -> Result<(u64, Vec<Review>), StoreError> {
        self.check_available()?;
        let reviews = self.reviews.lock().unwrap();
        let mut matching: Vec<Review> = reviews
            .iter()
            .rev()
            .filter(|r| match filter {
                ReviewFilter::All => true,
                ReviewFilter::Movie(m) => &r.movie_id == m,
                ReviewFilter::User(u) => &r.user_id == u,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        Ok((total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        self.check_available()?;
        Ok(self.get(id))
    }

    async fn create(&self, draft: ReviewDraft) -> Result<Review, StoreError> {
        self.check_available()?;
        let new = draft.validate().map_err(StoreError::Validation)?;
        let duplicate = self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.movie_id == new.movie_id && r.user_id == new.user_id);
        if duplicate {
            return Err(StoreError::Validation(vec![FieldError::new(
                "movieId",
                "you have already reviewed this movie",
            )]));
        }
        let review = self.seed(&new.movie_id, &new.user_id, new.rating);
        let mut reviews = self.reviews.lock().unwrap();
        let stored = reviews.iter_mut().find(|r| r.id == review.id).unwrap();
        stored.comment = new.comment;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn update(
        &self,
        existing: &Review,
        changes: ReviewChanges,
    ) -> Result<Review, StoreError> {
        self.check_available()?;
        changes.validate().map_err(StoreError::Validation)?;
        let mut reviews = self.reviews.lock().unwrap();
        let stored = reviews
            .iter_mut()
            .find(|r| r.id == existing.id)
            .ok_or_else(|| StoreError::Other(anyhow::anyhow!("review vanished")))?;
        if let Some(rating) = changes.rating {
            stored.rating = rating;
        }
        if changes.comment.is_some() {
            stored.comment = changes.comment;
        }
        stored.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn delete(&self, existing: &Review) -> Result<(), StoreError> {
        self.check_available()?;
        self.reviews.lock().unwrap().retain(|r| r.id != existing.id);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
