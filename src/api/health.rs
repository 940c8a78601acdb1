//! Liveness, readiness and startup probes.

use crate::api::models::{AppState, ProbeResponse};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Process lifecycle flags. Both transitions are one-way.
#[derive(Debug, Default)]
pub struct HealthState {
    started: AtomicBool,
    shutting_down: AtomicBool,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boot finished; the listener is bound.
    pub fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Shutdown has begun; probes start failing so traffic drains.
    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}

type Probe = (StatusCode, Json<ProbeResponse>);

fn probe(status: StatusCode, label: &'static str) -> Probe {
    (status, Json(ProbeResponse { status: label }))
}

/// Process health only; never touches the database.
pub async fn liveness(State(state): State<AppState>) -> Probe {
    if state.health.is_shutting_down() {
        return probe(StatusCode::INTERNAL_SERVER_ERROR, "shutting-down");
    }
    probe(StatusCode::OK, "alive")
}

/// Safe to route traffic here: started, not draining, database reachable.
pub async fn readiness(State(state): State<AppState>) -> Probe {
    if !state.health.is_started() || state.health.is_shutting_down() {
        return probe(StatusCode::SERVICE_UNAVAILABLE, "not-ready");
    }
    match state.store.ping().await {
        Ok(()) => probe(StatusCode::OK, "ready"),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            probe(StatusCode::SERVICE_UNAVAILABLE, "db-unavailable")
        }
    }
}

pub async fn startup(State(state): State<AppState>) -> Probe {
    if !state.health.is_started() {
        return probe(StatusCode::SERVICE_UNAVAILABLE, "starting");
    }
    probe(StatusCode::OK, "started")
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/liveness", get(liveness))
        .route("/readiness", get(readiness))
        .route("/startup", get(startup))
}
