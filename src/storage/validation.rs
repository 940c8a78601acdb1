//! Field rules applied by store adapters before any write.

use super::{ReviewChanges, ReviewDraft};
use serde::Serialize;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MAX_MOVIE_ID_CHARS: usize = 64;
pub const MAX_COMMENT_CHARS: usize = 2000;

/// One violated field, reported back to clients as `{field, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A draft that passed validation and can be inserted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub movie_id: String,
    pub user_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

impl ReviewDraft {
    /// Validate every field, collecting one error per violated field.
    pub fn validate(self) -> Result<NewReview, Vec<FieldError>> {
        let mut errors = Vec::new();

        let movie_id = self.movie_id.map(|m| m.trim().to_string());
        match movie_id.as_deref() {
            None | Some("") => errors.push(FieldError::new("movieId", "movieId is required")),
            Some(m) if m.chars().count() > MAX_MOVIE_ID_CHARS => errors.push(FieldError::new(
                "movieId",
                format!("movieId must be at most {MAX_MOVIE_ID_CHARS} characters"),
            )),
            Some(_) => {}
        }

        if self.user_id.trim().is_empty() {
            errors.push(FieldError::new("userId", "userId is required"));
        }

        match self.rating {
            None => errors.push(FieldError::new("rating", "rating is required")),
            Some(r) => check_rating(r, &mut errors),
        }

        if let Some(comment) = &self.comment {
            check_comment(comment, &mut errors);
        }

        match (errors.is_empty(), movie_id, self.rating) {
            (true, Some(movie_id), Some(rating)) => Ok(NewReview {
                movie_id,
                user_id: self.user_id,
                rating,
                comment: self.comment,
            }),
            _ => Err(errors),
        }
    }
}

impl ReviewChanges {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(r) = self.rating {
            check_rating(r, &mut errors);
        }
        if let Some(comment) = &self.comment {
            check_comment(comment, &mut errors);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check_rating(rating: i32, errors: &mut Vec<FieldError>) {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        errors.push(FieldError::new(
            "rating",
            format!("rating must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }
}

fn check_comment(comment: &str, errors: &mut Vec<FieldError>) {
    if comment.chars().count() > MAX_COMMENT_CHARS {
        errors.push(FieldError::new(
            "comment",
            format!("comment must be at most {MAX_COMMENT_CHARS} characters"),
        ));
    }
}
