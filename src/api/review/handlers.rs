use crate::api::auth::{Principal, can_mutate};
use crate::api::error::{ApiError, DomainError, JsonBody, PathParam, QueryParams};
use crate::api::models::{AppState, CreateReviewRequest, UpdateReviewRequest};
use crate::api::pagination::{PageQuery, Paginated};
use crate::storage::{Review, ReviewFilter};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

type ReviewPage = Json<Paginated<Review>>;

async fn list_page(
    state: &AppState,
    filter: ReviewFilter,
    query: &PageQuery,
) -> Result<ReviewPage, ApiError> {
    let window = state.page_limits.resolve_query(query);
    let (total, rows) = state.store.find_and_count(&filter, &window).await?;
    Ok(Json(Paginated::new(total, &window, rows)))
}

/// Load a review for mutation. Unknown and malformed ids are both 404 and are
/// checked before ownership.
async fn load_review(state: &AppState, raw_id: &str) -> Result<Review, ApiError> {
    let not_found =
        || DomainError::not_found("Review not found").with_details(json!({ "reviewId": raw_id }));
    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
    let review = state.store.find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(review)
}

/// Public listing of one movie's reviews
pub async fn list_by_movie(
    State(state): State<AppState>,
    PathParam(movie_id): PathParam<String>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ReviewPage, ApiError> {
    list_page(&state, ReviewFilter::Movie(movie_id), &query).await
}

/// The caller's own reviews. The path segment is not used for lookup.
pub async fn list_by_user(
    State(state): State<AppState>,
    principal: Option<Principal>,
    PathParam(_user_id): PathParam<String>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ReviewPage, ApiError> {
    let principal = principal.ok_or_else(|| DomainError::unauthorized("Unauthorized"))?;
    list_page(&state, ReviewFilter::User(principal.user_id), &query).await
}

/// Every review; admins only
pub async fn list_all(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ReviewPage, ApiError> {
    if !principal.is_admin() {
        return Err(DomainError::forbidden("Forbidden: Only admins can view all reviews").into());
    }
    list_page(&state, ReviewFilter::All, &query).await
}

pub async fn add_review(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(request): JsonBody<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state
        .store
        .create(request.into_draft(&principal.user_id))
        .await?;
    state.metrics.record_review_created();

    info!(review_id = %review.id, movie_id = %review.movie_id, user_id = %review.user_id, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<String>,
    JsonBody(request): JsonBody<UpdateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    let existing = load_review(&state, &id).await?;
    if !can_mutate(&principal, &existing.user_id) {
        return Err(DomainError::forbidden("You are not authorized to update this review").into());
    }

    let review = state.store.update(&existing, request.into()).await?;
    info!(review_id = %review.id, user_id = %principal.user_id, "Review updated");
    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    principal: Principal,
    PathParam(id): PathParam<String>,
) -> Result<StatusCode, ApiError> {
    let existing = load_review(&state, &id).await?;
    if !can_mutate(&principal, &existing.user_id) {
        return Err(DomainError::forbidden("You are not authorized to delete this review").into());
    }

    state.store.delete(&existing).await?;
    info!(review_id = %existing.id, user_id = %principal.user_id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
