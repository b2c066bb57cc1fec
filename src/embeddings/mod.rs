// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding models and token accounting
//!
//! The HTTP layer only sees the [`EmbeddingModel`] and [`TokenCounter`]
//! traits. Production wires in the ONNX model and a HuggingFace tokenizer;
//! tests and local development use [`HashEmbeddingModel`].

pub mod accounting;
pub mod onnx_model;
pub mod tokenizer;

pub use accounting::TokenAccountant;
pub use onnx_model::OnnxEmbeddingModel;
pub use tokenizer::{HfTokenCounter, TokenCounter};

use anyhow::{anyhow, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A text embedding model.
///
/// `encode` is blocking and CPU bound; callers run it on the inference pool,
/// never directly on the async runtime. Implementations must return exactly
/// one vector per input text, in input order.
pub trait EmbeddingModel: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector returned by `encode`
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Inference backend label attached to metrics (e.g. "onnx")
    fn backend(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct HashEmbeddingConfig {
    pub model: String,
    pub dimension: usize,
    pub normalize: bool,
}

/// Deterministic pseudo-embeddings derived from a hash of the text.
///
/// Same text, same vector. Useful wherever the real model is unavailable.
#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    config: HashEmbeddingConfig,
}

impl HashEmbeddingModel {
    pub fn new(config: HashEmbeddingConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }

        Ok(Self { config })
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.config.dimension);

        for i in 0..self.config.dimension {
            // LCG step, mixed with the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);

            // [-1, 1]
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        if self.config.normalize {
            l2_normalize(&mut embedding);
        }

        embedding
    }
}

impl EmbeddingModel for HashEmbeddingModel {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn backend(&self) -> &str {
        "hash"
    }
}

/// Scales `vector` to unit length in place; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
