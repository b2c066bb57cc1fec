// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Bounded offload of embedding computation
//!
//! Encoding a batch is CPU bound. Running it on the async runtime would stall
//! every other request served by that worker thread, so each batch is moved
//! onto a blocking thread and the request task awaits the result.
//!
//! A semaphore caps how many batches compute at once. The cap is a fixed
//! worker count chosen at startup, independent of how many requests are in
//! flight, so total CPU contention stays bounded.
//!
//! The worker count bounds batches in flight, not model parallelism: the ONNX
//! model serialises `run` on its session, so with more than one worker the
//! extra workers only overlap tokenization and pooling with inference.
//!
//! Cancellation is best-effort: if the awaiting request is dropped after its
//! batch was handed to a blocking thread, the batch still runs to completion
//! and holds its permit until it finishes.

use crate::embeddings::EmbeddingModel;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Default number of concurrent inference workers
pub const DEFAULT_INFERENCE_WORKERS: usize = 2;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The model returned an error for this batch
    #[error("{0}")]
    Computation(String),

    /// The model returned a different number of vectors than inputs
    #[error("model returned {actual} embeddings for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    /// The worker thread panicked or was cancelled
    #[error("inference worker failed: {0}")]
    Worker(String),

    #[error("inference pool is shut down")]
    PoolClosed,
}

/// Fixed-size pool that runs [`EmbeddingModel::encode`] off the runtime
#[derive(Clone)]
pub struct InferencePool {
    model: Arc<dyn EmbeddingModel>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl std::fmt::Debug for InferencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePool")
            .field("model", &self.model.model_name())
            .field("workers", &self.workers)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl InferencePool {
    /// Creates a pool running at most `workers` batches at once (minimum 1)
    pub fn new(model: Arc<dyn EmbeddingModel>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            model,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.model
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers currently idle
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Embeds `texts`, returning one vector per input in input order.
    ///
    /// The calling task suspends while waiting for a worker and while the
    /// batch computes; nothing else blocks the runtime. Either the whole
    /// batch succeeds or an error is returned, never a partial result.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, InferenceError> {
        let expected = texts.len();

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::PoolClosed)?;

        let model = self.model.clone();
        let handle = tokio::task::spawn_blocking(move || {
            // Released when the batch finishes, even if nobody awaits it
            let _permit = permit;
            model.encode(&texts)
        });

        let embeddings = match handle.await {
            Ok(Ok(embeddings)) => embeddings,
            Ok(Err(e)) => {
                error!(error = %e, batch = expected, "Embedding computation failed");
                return Err(InferenceError::Computation(e.to_string()));
            }
            Err(e) => {
                error!(error = %e, batch = expected, "Inference worker failed");
                return Err(InferenceError::Worker(e.to_string()));
            }
        };

        if embeddings.len() != expected {
            return Err(InferenceError::LengthMismatch {
                expected,
                actual: embeddings.len(),
            });
        }

        debug!(batch = expected, "Embedding batch computed");
        Ok(embeddings)
    }

    /// Stops handing out workers; pending and future calls fail with
    /// [`InferenceError::PoolClosed`]. Batches already running finish.
    pub fn close(&self) {
        self.permits.close();
    }
}
