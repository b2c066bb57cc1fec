// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request pipeline composition
//!
//! Every route is wrapped, outermost first, by:
//!
//! 1. request tracing (logs every request, rejections included)
//! 2. the auth gate (may answer 401 and stop)
//! 3. metrics (times and counts what the gate let through)
//! 4. the route handler
//!
//! Requests rejected by the gate are therefore never counted in
//! `http_requests_total` nor timed; everything that reaches the metrics
//! layer is recorded exactly once, whether the handler succeeds or fails.

use crate::api::middleware::{auth_middleware, metrics_middleware, AuthGate};
use crate::monitoring::ServiceMetrics;
use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Wraps `routes` in the fixed middleware order documented above
pub fn apply_pipeline(routes: Router, gate: Arc<AuthGate>, metrics: Arc<ServiceMetrics>) -> Router {
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(gate, auth_middleware))
            .layer(middleware::from_fn_with_state(metrics, metrics_middleware)),
    )
}
