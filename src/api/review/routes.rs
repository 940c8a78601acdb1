use crate::api::models::AppState;
use crate::api::review::handlers::{
    add_review, delete_review, list_all, list_by_movie, list_by_user, update_review,
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get", get(list_all))
        .route("/getByMovie/{movieId}", get(list_by_movie))
        .route("/getByUser/{userId}", get(list_by_user))
        .route("/add", post(add_review))
        .route("/update/{id}", put(update_review))
        .route("/delete/{id}", delete(delete_review))
}
