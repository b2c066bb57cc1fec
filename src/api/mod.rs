// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embeddings;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod middleware;
pub mod pipeline;

pub use embeddings::{create_embeddings, EmbeddingRequest, EmbeddingsResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, ServiceInfo};
pub use http_server::{create_app, start_server, AppState};
pub use middleware::{AuthDecision, AuthGate};
pub use pipeline::apply_pipeline;
