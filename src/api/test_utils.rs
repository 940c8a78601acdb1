//! Router harness shared by handler tests.

use crate::api::auth::{Claims, TokenVerifier};
use crate::api::error::ErrorClassifier;
use crate::api::health::HealthState;
use crate::api::metrics::Metrics;
use crate::api::models::AppState;
use crate::api::pagination::PageLimits;
use crate::api::router;
use crate::config::Environment;
use crate::storage::memory::MemoryReviewStore;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response, header};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

pub fn token_for(user_id: &str, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: Some(role.to_string()),
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryReviewStore>,
    router: Router,
}

impl TestApp {
    /// Started app in production mode.
    pub fn new() -> Self {
        let app = Self::build(Environment::Production);
        app.state.health.mark_started();
        app
    }

    pub fn unstarted() -> Self {
        Self::build(Environment::Production)
    }

    pub fn development() -> Self {
        let app = Self::build(Environment::Development);
        app.state.health.mark_started();
        app
    }

    fn build(environment: Environment) -> Self {
        let store = Arc::new(MemoryReviewStore::new());
        let state = AppState {
            store: store.clone(),
            verifier: Arc::new(TokenVerifier::new(TEST_SECRET, None)),
            metrics: Arc::new(Metrics::new().unwrap()),
            health: Arc::new(HealthState::new()),
            classifier: ErrorClassifier::new(environment),
            page_limits: PageLimits::default(),
        };
        Self {
            router: router(state.clone()),
            state,
            store,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, token, None).await
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
