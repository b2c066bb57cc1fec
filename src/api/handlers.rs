// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Service banner returned by `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub model: String,
    pub dimensions: usize,
}

pub async fn root_handler(State(state): State<AppState>) -> Json<ServiceInfo> {
    let model = state.inference.model();
    Json(ServiceInfo {
        message: "Langcache Embeddings API is running".to_string(),
        model: model.model_name().to_string(),
        dimensions: model.dimension(),
    })
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus text exposition of the service registry
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::InternalError(e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, state.metrics.content_type())],
        body,
    )
        .into_response())
}
