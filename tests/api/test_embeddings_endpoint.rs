// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/embeddings behaviour
//!
//! Covers response shape, index alignment, usage accounting, base64
//! encoding, malformed or rejected bodies and computation/tokenization
//! failures.

use super::support::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use langcache_embeddings_api::{api::create_app, embeddings::EmbeddingModel};
use std::sync::Arc;

#[tokio::test]
async fn test_single_input() {
    let app = create_app(state(None));

    let (status, body) = send(app, embeddings_request(r#"{"input":"hello world"}"#, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["object"], "list");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["object"], "embedding");
    assert_eq!(data[0]["index"], 0);
    assert_eq!(data[0]["embedding"].as_array().unwrap().len(), DIMENSION);

    // two words + two special tokens
    assert_eq!(body["usage"]["total_tokens"], 4);
    assert_eq!(body["usage"]["prompt_tokens"], 4);
}

#[tokio::test]
async fn test_batch_indices_follow_input_order() {
    let app = create_app(state(None));

    let (status, body) = send(app, embeddings_request(r#"{"input":["a","b","c"]}"#, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for (i, item) in data.iter().enumerate() {
        assert_eq!(item["index"], i);
    }
    assert_eq!(body["usage"]["total_tokens"], 9);
}

#[tokio::test]
async fn test_each_vector_matches_its_input() {
    let model = hash_model();
    let texts: Vec<String> = (0..16).map(|i| format!("sentence number {}", i)).collect();
    let expected = model.encode(&texts).unwrap();
    let app = create_app(state(None));

    let request_body = serde_json::json!({ "input": texts }).to_string();
    let (status, body) = send(app, embeddings_request(&request_body, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), texts.len());

    for (i, item) in data.iter().enumerate() {
        let vector: Vec<f32> = serde_json::from_value(item["embedding"].clone()).unwrap();
        assert_eq!(vector, expected[i], "embedding {} out of place", i);
    }
}

#[tokio::test]
async fn test_empty_batch() {
    let app = create_app(state(None));

    let (status, body) = send(app, embeddings_request(r#"{"input":[]}"#, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["usage"]["total_tokens"], 0);
}

#[tokio::test]
async fn test_base64_encoding_format() {
    let model = hash_model();
    let expected = model.embed_one("hello");
    let app = create_app(state(None));

    let (status, body) = send(
        app,
        embeddings_request(r#"{"input":"hello","encoding_format":"base64"}"#, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let encoded = body["data"][0]["embedding"].as_str().unwrap();
    let bytes = STANDARD.decode(encoded).unwrap();
    let decoded: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(decoded, expected);
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    for body in [r#"{"input": 5}"#, r#"{}"#, r#"{"input":"x","encoding_format":"int8"}"#] {
        let (status, response) = send(app.clone(), embeddings_request(body, &[])).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert!(json(&response)["detail"].is_string());
    }

    assert_eq!(metrics.prompt_token_stats(), (0, 0.0));
}

#[tokio::test]
async fn test_computation_failure_returns_detail() {
    let state = state_with(Arc::new(FailingModel), Arc::new(WordCounter), None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, body) = send(app, embeddings_request(r#"{"input":"hello"}"#, &[])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["detail"], "model exploded");
    assert!(body.get("data").is_none());

    // No token accounting for a failed batch
    assert_eq!(metrics.prompt_token_stats(), (0, 0.0));
}

#[tokio::test]
async fn test_tokenization_failure_is_server_error() {
    let state = state_with(Arc::new(hash_model()), Arc::new(FailingCounter), None);
    let app = create_app(state);

    let (status, body) = send(app, embeddings_request(r#"{"input":"hello"}"#, &[])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["detail"], "tokenizer unavailable");
}

#[tokio::test]
async fn test_token_observation_recorded_once_per_success() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    let (status, _) = send(
        app,
        embeddings_request(r#"{"input":["one two", "three"]}"#, &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics.prompt_token_stats(), (1, 7.0));
}

#[tokio::test]
async fn test_oversized_body_keeps_payload_too_large_status() {
    let state = state(None);
    let metrics = state.metrics.clone();
    let app = create_app(state);

    // Valid JSON, just beyond the default 2 MB body limit
    let text = "a ".repeat(1_500_000);
    let body = serde_json::json!({ "input": text }).to_string();

    let (status, response) = send(app, embeddings_request(&body, &[])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json(&response)["detail"].is_string());
    assert_eq!(metrics.prompt_token_stats(), (0, 0.0));
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let app = create_app(state(None));
    let request = Request::builder()
        .method("POST")
        .uri("/v1/embeddings")
        .body(Body::from(r#"{"input":"hello"}"#))
        .unwrap();

    let (status, response) = send(app, request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json(&response)["detail"].is_string());
}
