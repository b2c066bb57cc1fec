// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Langcache Embeddings API

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-openai-embeddings";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "openai-embeddings",
    "opt-in-bearer-auth",
    "prometheus-metrics",
    "bounded-inference-pool",
    "base64-encoding",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Langcache Embeddings API {} ({})", VERSION_NUMBER, VERSION)
}
