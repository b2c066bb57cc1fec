// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod pool;

pub use pool::{InferenceError, InferencePool, DEFAULT_INFERENCE_WORKERS};
