// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Token counting for usage reporting

use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// Counts the tokens one text encodes to.
///
/// Counts include any special tokens the tokenizer adds. Implementations
/// must be cheap enough to run inline on the request task.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// [`TokenCounter`] backed by a HuggingFace `tokenizer.json`.
///
/// No truncation is configured, so the count reflects the full prompt even
/// when the model itself only sees a prefix.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for HfTokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenCounter").finish_non_exhaustive()
    }
}

impl HfTokenCounter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;

        // Padding would inflate counts
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow!("Failed to disable truncation: {}", e))?;

        Ok(Self { tokenizer })
    }

    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        Ok(encoding.get_ids().len())
    }
}
