// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prompt token accounting
//!
//! Sums per-text token counts for the `usage` block of an embeddings
//! response and records the total into the `prompt_tokens_length`
//! histogram. Callers invoke it only after the embedding batch succeeded.

use super::TokenCounter;
use crate::monitoring::ServiceMetrics;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct TokenAccountant {
    counter: Arc<dyn TokenCounter>,
    metrics: Arc<ServiceMetrics>,
}

impl TokenAccountant {
    pub fn new(counter: Arc<dyn TokenCounter>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { counter, metrics }
    }

    /// Returns the total token count of `texts` and records one observation.
    ///
    /// Nothing is recorded if any text fails to tokenize.
    pub fn count(&self, texts: &[String]) -> Result<usize> {
        let mut total = 0usize;
        for text in texts {
            total += self.counter.count_tokens(text)?;
        }

        self.metrics.observe_prompt_tokens(total);
        debug!(texts = texts.len(), total_tokens = total, "Counted prompt tokens");

        Ok(total)
    }
}
