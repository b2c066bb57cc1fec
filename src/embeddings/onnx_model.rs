// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Embedding Model Wrapper
//!
//! Runs a sentence transformer exported to ONNX through ONNX Runtime.
//!
//! Features:
//! - ONNX model loading from disk
//! - GPU acceleration via CUDA (with automatic CPU fallback)
//! - Tokenization with truncation to the model's context length
//! - Batch embedding generation with attention-masked mean pooling
//! - L2 normalised output vectors
//! - Output dimension discovered by a validation inference at load time

use super::{l2_normalize, EmbeddingModel};
use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, ArrayViewD, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{info, warn};

/// Maximum sequence length fed to the model
pub const DEFAULT_MAX_LENGTH: usize = 8192;

/// ONNX-based sentence embedding model
///
/// # Model contract
/// - Inputs: `input_ids`, `attention_mask`, `token_type_ids` (all i64, `[batch, seq]`)
/// - Output 0: token embeddings `[batch, seq, hidden]`
///
/// # Thread Safety
/// ONNX Runtime sessions need `&mut` to run, so the session sits behind a
/// mutex and `run` calls are serialised. Tokenization and pooling happen
/// outside the lock.
pub struct OnnxEmbeddingModel {
    session: Mutex<Session>,

    /// Tokenizer with truncation enabled
    tokenizer: Tokenizer,

    model_name: String,

    dimension: usize,

    max_length: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer from disk
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - The validation inference does not produce `[batch, seq, hidden]`
    ///
    /// # Example
    /// ```ignore
    /// let model = OnnxEmbeddingModel::load(
    ///     "redis/langcache-embed-v1",
    ///     "./models/langcache-embed-v1/model.onnx",
    ///     "./models/langcache-embed-v1/tokenizer.json",
    ///     8192,
    /// )?;
    /// ```
    pub fn load<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        max_length: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        info!(model = %model_name, "Initializing ONNX embedding model");

        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        let mut session = match cuda_result {
            Ok(s) => {
                info!("CUDA execution provider initialized");
                s
            }
            Err(e) => {
                warn!(error = %e, "CUDA execution provider failed, falling back to CPU");
                Session::builder()
                    .context("Failed to create session builder")?
                    .with_execution_providers([CPUExecutionProvider::default().build()])
                    .context("Failed to set CPU execution provider")?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .context("Failed to set optimization level")?
                    .with_intra_threads(4)
                    .context("Failed to set intra threads")?
                    .commit_from_file(model_path)
                    .context(format!(
                        "Failed to load ONNX model from {}",
                        model_path.display()
                    ))?
            }
        };

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let dimension = Self::probe_dimension(&mut session, &tokenizer)?;

        info!(
            model = %model_name,
            dimension,
            max_length,
            "ONNX embedding model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_name,
            dimension,
            max_length,
        })
    }

    /// Runs one inference to learn the hidden size
    fn probe_dimension(session: &mut Session, tokenizer: &Tokenizer) -> Result<usize> {
        let encoding = tokenizer
            .encode("validation test", true)
            .map_err(|e| anyhow!("Tokenizer validation failed: {}", e))?;

        let len = encoding.get_ids().len();
        let input_ids = Array2::from_shape_vec(
            (1, len),
            encoding.get_ids().iter().map(|&id| id as i64).collect(),
        )
        .context("Failed to create input_ids array")?;
        let attention_mask = Array2::from_shape_vec(
            (1, len),
            encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect(),
        )
        .context("Failed to create attention_mask array")?;
        let token_type_ids = Array2::from_shape_vec((1, len), vec![0i64; len])
            .context("Failed to create token_type_ids array")?;

        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        let shape = output_tensor.shape();

        if shape.len() != 3 || shape[2] == 0 {
            anyhow::bail!(
                "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, hidden])",
                shape
            );
        }

        Ok(shape[2])
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl EmbeddingModel for OnnxEmbeddingModel {
    /// Tokenizes all texts, pads them to the batch maximum and runs one
    /// inference for the whole batch.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_batch = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask_batch = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let padding_needed = max_len - ids.len();

            input_ids_batch.extend(ids.iter().map(|&id| id as i64));
            input_ids_batch.extend(std::iter::repeat(0i64).take(padding_needed));
            attention_mask_batch.extend(mask.iter().map(|&m| m as i64));
            attention_mask_batch.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        // Kept for pooling, the tensor takes ownership of the batch
        let pooling_mask = attention_mask_batch.clone();

        let input_ids_array = Array2::from_shape_vec((texts.len(), max_len), input_ids_batch)
            .context("Failed to create batch input_ids array")?;
        let attention_mask_array =
            Array2::from_shape_vec((texts.len(), max_len), attention_mask_batch)
                .context("Failed to create batch attention_mask array")?;
        let token_type_ids_array =
            Array2::from_shape_vec((texts.len(), max_len), vec![0i64; texts.len() * max_len])
                .context("Failed to create batch token_type_ids array")?;

        // Owned copy of the output so the session is released before pooling
        let output = {
            let mut session = lock_recovering(&self.session);
            let outputs = session.run(ort::inputs![
                "input_ids" => Value::from_array(input_ids_array)?,
                "attention_mask" => Value::from_array(attention_mask_array)?,
                "token_type_ids" => Value::from_array(token_type_ids_array)?
            ])?;

            outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?
                .to_owned()
        };

        let embeddings = mean_pool(output.view(), &pooling_mask, max_len)?;

        for (batch_idx, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    batch_idx,
                    embedding.len(),
                    self.dimension
                );
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> &str {
        "onnx"
    }
}

/// Takes the lock, recovering it if an earlier holder panicked.
///
/// The session holds no state between runs, so a poisoned guard is still
/// usable.
fn lock_recovering<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Attention-masked mean pooling of `[batch, seq, hidden]` token embeddings,
/// followed by L2 normalisation.
///
/// `mask` holds `batch * max_len` entries, row-major. Returns an error
/// instead of panicking when the output shape does not match the mask.
fn mean_pool(output: ArrayViewD<'_, f32>, mask: &[i64], max_len: usize) -> Result<Vec<Vec<f32>>> {
    let shape = output.shape();
    if shape.len() != 3 {
        anyhow::bail!("Model outputs unexpected dimensions: {:?}", shape);
    }
    let (batch, seq_len, hidden) = (shape[0], shape[1], shape[2]);
    if batch * max_len != mask.len() || seq_len > max_len {
        anyhow::bail!(
            "Model output shape {:?} does not match a batch of {} padded to {}",
            shape,
            mask.len() / max_len.max(1),
            max_len
        );
    }

    let mut embeddings = Vec::with_capacity(batch);
    for batch_idx in 0..batch {
        let item = output.index_axis(Axis(0), batch_idx); // [seq_len, hidden]
        let row_mask = &mask[batch_idx * max_len..(batch_idx + 1) * max_len];

        let mut pooled = vec![0.0f32; hidden];
        let mut sum_mask = 0.0f32;

        for i in 0..seq_len {
            let mask_value = row_mask[i] as f32;
            sum_mask += mask_value;
            for j in 0..hidden {
                pooled[j] += item[[i, j]] * mask_value;
            }
        }

        for val in &mut pooled {
            *val /= sum_mask.max(1e-9);
        }
        l2_normalize(&mut pooled);

        embeddings.push(pooled);
    }

    Ok(embeddings)
}
