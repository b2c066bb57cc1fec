// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// src/monitoring/mod.rs - Service metrics

pub mod metrics;

pub use metrics::{
    ModelLabels, RequestLabels, ServiceMetrics, LATENCY_BUCKETS_MS, PROMPT_TOKEN_BUCKETS,
};
