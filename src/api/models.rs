use crate::api::auth::TokenVerifier;
use crate::api::error::ErrorClassifier;
use crate::api::health::HealthState;
use crate::api::metrics::Metrics;
use crate::api::pagination::PageLimits;
use crate::storage::{ReviewChanges, ReviewDraft, ReviewStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
    pub verifier: Arc<TokenVerifier>,
    pub metrics: Arc<Metrics>,
    pub health: Arc<HealthState>,
    pub classifier: ErrorClassifier,
    pub page_limits: PageLimits,
}

/// Request to add a new review. Fields are optional so missing ones are
/// reported per field by validation rather than as a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub movie_id: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl CreateReviewRequest {
    pub fn into_draft(self, owner_id: &str) -> ReviewDraft {
        ReviewDraft {
            movie_id: self.movie_id,
            user_id: owner_id.to_string(),
            rating: self.rating,
            comment: self.comment,
        }
    }
}

/// Request to change an existing review
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl From<UpdateReviewRequest> for ReviewChanges {
    fn from(request: UpdateReviewRequest) -> Self {
        Self {
            rating: request.rating,
            comment: request.comment,
        }
    }
}

/// Body of every health probe response
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
}
