// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request count and latency recording
//!
//! Every request passing through records exactly one increment of
//! `http_requests_total` and one observation of
//! `http_request_duration_milliseconds`, labelled with the method, the
//! matched route template, the final status code and the model labels.
//! Unmatched routes and non-standard methods collapse into fixed labels so
//! clients cannot grow the series set.
//! Handler failures are recorded with their status; a panic is recorded as
//! 500 and then resumed so it still reaches the transport layer.

use crate::monitoring::{RequestLabels, ServiceMetrics};
use axum::{
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Endpoint label for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Method label for anything outside the standard HTTP methods
pub const OTHER_METHOD: &str = "OTHER";

static STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::CONNECT,
    Method::TRACE,
];

fn method_label(method: &Method) -> &'static str {
    STANDARD_METHODS
        .iter()
        .find(|standard| *standard == method)
        .map(Method::as_str)
        .unwrap_or(OTHER_METHOD)
}

pub async fn metrics_middleware(
    State(metrics): State<Arc<ServiceMetrics>>,
    matched_path: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = method_label(request.method());
    let endpoint = matched_path
        .as_ref()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;

    let status = match &outcome {
        Ok(response) => response.status(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Truncated to whole milliseconds
    let duration_ms = start.elapsed().as_millis() as u64;
    metrics.observe_request(
        &RequestLabels {
            method,
            endpoint: &endpoint,
            status_code: status.as_u16(),
        },
        duration_ms,
    );

    match outcome {
        Ok(response) => response,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
