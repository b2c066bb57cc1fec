// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/embeddings handler

use super::{EmbeddingRequest, EmbeddingsResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::{error, info};

/// Embeds the request's input texts.
///
/// The batch is computed on the inference pool; this task only suspends
/// while waiting for it. Tokens are counted after the batch succeeded, so a
/// failed batch records no token observation.
///
/// # Errors
/// - 422 when the body does not deserialize
/// - 500 `{"detail": ...}` when the model or tokenizer fails
pub async fn create_embeddings(
    State(state): State<AppState>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Json<EmbeddingsResponse>, ApiError> {
    let Json(request) = payload?;
    let format = request.encoding_format();
    let texts = request.input.into_texts();

    let embeddings = state.inference.embed(texts.clone()).await?;

    let total_tokens = state.accountant.count(&texts).map_err(|e| {
        error!(error = %e, "Token counting failed");
        ApiError::TokenizationFailed(e.to_string())
    })?;

    info!(texts = texts.len(), total_tokens, "Generated embeddings");

    Ok(Json(EmbeddingsResponse::new(embeddings, format, total_tokens)))
}
