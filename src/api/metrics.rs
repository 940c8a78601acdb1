//! Prometheus counters for review creation and HTTP traffic.

use crate::api::error::ApiError;
use crate::api::models::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Metric handles plus the registry they are exported from.
///
/// - `reviews_created_total`: counter
/// - `http_requests_total{method,route,status}`: counter
/// - `http_request_duration_seconds{method,route,status}`: histogram
pub struct Metrics {
    registry: Registry,
    reviews_created: IntCounter,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reviews_created =
            IntCounter::new("reviews_created_total", "Total number of reviews created")?;
        registry.register(Box::new(reviews_created.clone()))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled"),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let http_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(http_duration.clone()))?;

        Ok(Self {
            registry,
            reviews_created,
            http_requests,
            http_duration,
        })
    }

    pub fn record_review_created(&self) {
        self.reviews_created.inc();
    }

    #[cfg(test)]
    pub fn reviews_created(&self) -> u64 {
        self.reviews_created.get()
    }

    fn observe_request(&self, method: &str, route: &str, status: &str, seconds: f64) {
        let labels = [method, route, status];
        self.http_requests.with_label_values(&labels[..]).inc();
        self.http_duration.with_label_values(&labels[..]).observe(seconds);
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Route-layer middleware; labels use the route template, not the raw path.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state.metrics.observe_request(
        &method,
        &route,
        response.status().as_str(),
        started.elapsed().as_secs_f64(),
    );
    response
}

pub async fn export(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| anyhow::anyhow!("failed to encode metrics: {e}"))?;
    Ok((
        [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
        body,
    )
        .into_response())
}
