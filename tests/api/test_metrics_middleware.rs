// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request metrics through the full pipeline
//!
//! Each request that passes the auth gate must produce exactly one counter
//! increment and one latency observation, whatever its outcome.

use super::support::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use langcache_embeddings_api::{
    api::{apply_pipeline, create_app, middleware::{OTHER_METHOD, UNMATCHED_ENDPOINT}},
    monitoring::{ModelLabels, RequestLabels, ServiceMetrics},
};
use std::sync::Arc;
use tower::ServiceExt;

fn labels<'a>(method: &'a str, endpoint: &'a str, status_code: u16) -> RequestLabels<'a> {
    RequestLabels {
        method,
        endpoint,
        status_code,
    }
}

#[tokio::test]
async fn test_successful_request_recorded_once() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(app, embeddings_request(r#"{"input":"hello"}"#, &[])).await;
    assert_eq!(status, StatusCode::OK);

    let ok = labels("POST", "/v1/embeddings", 200);
    assert_eq!(metrics.request_count(&ok), 1);
    let (observations, sum_ms) = metrics.request_latency(&ok);
    assert_eq!(observations, 1);
    assert!(sum_ms >= 0.0);
}

#[tokio::test]
async fn test_failed_request_recorded_with_its_status() {
    let state = state_with(Arc::new(FailingModel), Arc::new(WordCounter), None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(app, embeddings_request(r#"{"input":"hello"}"#, &[])).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let failed = labels("POST", "/v1/embeddings", 500);
    assert_eq!(metrics.request_count(&failed), 1);
    assert_eq!(metrics.request_latency(&failed).0, 1);
    assert_eq!(metrics.request_count(&labels("POST", "/v1/embeddings", 200)), 0);
}

#[tokio::test]
async fn test_validation_failure_recorded() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(app, embeddings_request("not json", &[])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let rejected = labels("POST", "/v1/embeddings", 422);
    assert_eq!(metrics.request_count(&rejected), 1);
    assert_eq!(metrics.request_latency(&rejected).0, 1);
}

#[tokio::test]
async fn test_each_request_counted_separately() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    for _ in 0..5 {
        let (status, _) = send(app.clone(), get_request("/health", &[])).await;
        assert_eq!(status, StatusCode::OK);
    }

    let health = labels("GET", "/health", 200);
    assert_eq!(metrics.request_count(&health), 5);
    assert_eq!(metrics.request_latency(&health).0, 5);
}

#[tokio::test]
async fn test_unauthorized_request_not_recorded() {
    let state = state(Some("k1"));
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(
        app,
        embeddings_request(r#"{"input":"hello"}"#, &[("X-Require-Auth", "true")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(metrics.request_count(&labels("POST", "/v1/embeddings", 401)), 0);
    assert_eq!(metrics.request_latency(&labels("POST", "/v1/embeddings", 401)).0, 0);
}

#[tokio::test]
async fn test_unknown_route_uses_fixed_endpoint_label() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(app.clone(), get_request("/does-not-exist", &[])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app, get_request("/another/missing/path", &[])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(metrics.request_count(&labels("GET", UNMATCHED_ENDPOINT, 404)), 2);
    assert_eq!(metrics.request_count(&labels("GET", "/does-not-exist", 404)), 0);
}

#[tokio::test]
async fn test_extension_methods_share_one_series() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    for i in 0..20 {
        let request = Request::builder()
            .method(format!("X{}", i).as_str())
            .uri("/whatever")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let other = labels(OTHER_METHOD, UNMATCHED_ENDPOINT, 404);
    assert_eq!(metrics.request_count(&other), 20);
    assert_eq!(metrics.request_latency(&other).0, 20);

    let text = metrics.render().unwrap();
    let series = text
        .lines()
        .filter(|line| line.starts_with("http_requests_total{"))
        .count();
    assert_eq!(series, 1);
    assert!(!text.contains(r#"method="X0""#));
}

async fn boom() -> &'static str {
    panic!("handler blew up")
}

#[tokio::test]
async fn test_panicking_handler_recorded_as_server_error() {
    let metrics = Arc::new(
        ServiceMetrics::new(ModelLabels::new(MODEL_NAME, "hash")).unwrap(),
    );
    let routes = Router::new().route("/boom", get(boom));
    let app = apply_pipeline(routes, Arc::new(gate(None)), metrics.clone());

    let outcome = tokio::spawn(async move { app.oneshot(get_request("/boom", &[])).await }).await;

    match outcome {
        Ok(_) => panic!("panic should propagate past the middleware"),
        Err(err) => assert!(err.is_panic()),
    }

    let panicked = labels("GET", "/boom", 500);
    assert_eq!(metrics.request_count(&panicked), 1);
    assert_eq!(metrics.request_latency(&panicked).0, 1);
}
