//! Error taxonomy and the boundary that turns failures into JSON responses.
//!
//! Handlers return [`ApiError`]. Its `IntoResponse` impl only sets the status
//! and parks the error in the response extensions; [`error_boundary`] then
//! classifies it once, logs it once, and renders the body for the configured
//! [`Environment`].

use crate::config::Environment;
use crate::storage::{FieldError, StoreError};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

/// An intentionally raised failure that carries its own status and code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<Value>,
}

impl DomainError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

/// Every failure a handler can return, already sorted into one of four kinds.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(e) => e.status(),
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(fields) => Self::Validation(fields),
            StoreError::Unavailable(reason) => Self::Unavailable(reason),
            StoreError::Other(source) => Self::Unclassified(source),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        DomainError::bad_request("INVALID_BODY", rejection.body_text()).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        DomainError::new(rejection.status(), "INVALID_PATH", rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        DomainError::bad_request("INVALID_QUERY", rejection.body_text()).into()
    }
}

#[derive(Clone)]
struct RaisedError(Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response.extensions_mut().insert(RaisedError(Arc::new(self)));
        response
    }
}

/// JSON body extractor whose rejections go through the same boundary.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Decides status and body for an [`ApiError`]
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    environment: Environment,
}

impl ErrorClassifier {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn classify(&self, err: &ApiError) -> (StatusCode, ErrorBody) {
        let body = match err {
            ApiError::Domain(e) => ErrorBody {
                code: e.code().to_string(),
                message: e.message().to_string(),
                details: e.details().cloned(),
                stack: None,
            },
            ApiError::Validation(fields) => ErrorBody {
                code: "VALIDATION_ERROR".to_string(),
                message: "Invalid data provided".to_string(),
                details: Some(Value::Array(
                    fields
                        .iter()
                        .map(|f| json!({ "field": f.field, "message": f.message }))
                        .collect(),
                )),
                stack: None,
            },
            ApiError::Unavailable(_) => ErrorBody {
                code: "SERVICE_UNAVAILABLE".to_string(),
                message: "Database connection failed".to_string(),
                details: None,
                stack: None,
            },
            ApiError::Unclassified(source) => match self.environment {
                Environment::Development => ErrorBody {
                    code: "INTERNAL_SERVER_ERROR".to_string(),
                    message: source.to_string(),
                    details: None,
                    stack: Some(format!("{source:?}")),
                },
                Environment::Production => ErrorBody {
                    code: "INTERNAL_SERVER_ERROR".to_string(),
                    message: "Something went wrong".to_string(),
                    details: None,
                    stack: None,
                },
            },
        };
        (err.status(), body)
    }

    /// Log the original error, then render its response.
    pub fn respond(&self, err: &ApiError, method: &Method, path: &str) -> Response {
        let (status, body) = self.classify(err);
        if status.is_server_error() {
            error!(%method, path, status = status.as_u16(), code = %body.code, error = ?err, "Request failed");
        } else {
            warn!(%method, path, status = status.as_u16(), code = %body.code, error = %err, "Request rejected");
        }
        (status, Json(ErrorEnvelope { error: body })).into_response()
    }
}

/// Middleware rendering any [`ApiError`] raised further down the stack.
pub async fn error_boundary(
    State(classifier): State<ErrorClassifier>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;

    match response.extensions().get::<RaisedError>() {
        Some(RaisedError(err)) => classifier.respond(err, &method, &path),
        None => response,
    }
}
