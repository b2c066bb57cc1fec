// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response body for POST /v1/embeddings

use super::EncodingFormat;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingVector {
    Float(Vec<f32>),
    Base64(String),
}

impl EmbeddingVector {
    pub fn encode(vector: Vec<f32>, format: EncodingFormat) -> Self {
        match format {
            EncodingFormat::Float => EmbeddingVector::Float(vector),
            EncodingFormat::Base64 => {
                let bytes: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
                EmbeddingVector::Base64(STANDARD.encode(bytes))
            }
        }
    }
}

/// One embedding, `index` is the position of its input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub object: String,
    pub embedding: EmbeddingVector,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

/// # Example
/// ```json
/// {
///   "object": "list",
///   "data": [{"object": "embedding", "embedding": [0.1, 0.2], "index": 0}],
///   "usage": {"prompt_tokens": 4, "total_tokens": 4}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub object: String,
    pub data: Vec<EmbeddingData>,
    pub usage: Usage,
}

impl EmbeddingsResponse {
    /// Builds the response from index-aligned vectors
    pub fn new(embeddings: Vec<Vec<f32>>, format: EncodingFormat, total_tokens: usize) -> Self {
        let data = embeddings
            .into_iter()
            .enumerate()
            .map(|(index, vector)| EmbeddingData {
                object: "embedding".to_string(),
                embedding: EmbeddingVector::encode(vector, format),
                index,
            })
            .collect();

        Self {
            object: "list".to_string(),
            data,
            usage: Usage {
                prompt_tokens: total_tokens,
                total_tokens,
            },
        }
    }
}
