// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request body for POST /v1/embeddings

use serde::{Deserialize, Serialize};

/// `input` accepts either one string or an array of strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Texts to embed, in request order
    pub fn into_texts(self) -> Vec<String> {
        match self {
            EmbeddingInput::Single(text) => vec![text],
            EmbeddingInput::Batch(texts) => texts,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How vectors are serialized in the response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    #[default]
    Float,
    /// Little-endian f32 bytes, base64 encoded
    Base64,
}

/// Request body for POST /v1/embeddings
///
/// # Example
/// ```json
/// {
///   "input": ["Hello world", "Another text"],
///   "encoding_format": "float"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,

    /// Default: float. `null` is treated as absent.
    #[serde(default)]
    pub encoding_format: Option<EncodingFormat>,

    /// Accepted for client compatibility; the served model is fixed
    #[serde(default)]
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn encoding_format(&self) -> EncodingFormat {
        self.encoding_format.unwrap_or_default()
    }
}
