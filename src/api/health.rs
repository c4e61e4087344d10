// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Identity provider key set status ("ok" or "unavailable").
    pub jwks: String,
    /// Number of signing keys currently cached.
    pub keys: usize,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Report whether signing keys are cached.
///
/// Never fetches: probes are unauthenticated and must not drive traffic to
/// the identity provider. `main` warms the cache and token lookups refill it.
async fn check_jwks(state: &AppState) -> (bool, usize) {
    match state.verifier.directory().snapshot().await {
        Some(snapshot) => (true, snapshot.len()),
        None => {
            debug!("No key set cached yet");
            (false, 0)
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (jwks_ok, keys) = check_jwks(&state).await;

    let response = ReadyResponse {
        status: if jwks_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            jwks: if jwks_ok { "ok" } else { "unavailable" }.to_string(),
            keys,
        },
    };

    let status = if jwks_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only once signing keys can be served.
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
