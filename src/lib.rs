// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod inference;
pub mod monitoring;
pub mod version;

pub use api::{create_app, start_server, AppState, AuthGate};
pub use config::ServiceConfig;
pub use embeddings::{EmbeddingModel, TokenAccountant, TokenCounter};
pub use inference::{InferenceError, InferencePool};
pub use monitoring::ServiceMetrics;
