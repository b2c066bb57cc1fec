// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{info, warn};

use super::embeddings::create_embeddings;
use super::handlers::{health_handler, metrics_handler, root_handler};
use super::middleware::AuthGate;
use super::pipeline::apply_pipeline;
use crate::embeddings::{EmbeddingModel, TokenAccountant, TokenCounter};
use crate::inference::InferencePool;
use crate::monitoring::{ModelLabels, ServiceMetrics};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub inference: InferencePool,
    pub accountant: TokenAccountant,
    pub metrics: Arc<ServiceMetrics>,
    pub auth: Arc<AuthGate>,
}

impl AppState {
    /// Builds the state around one model, with a fresh metrics registry
    /// labelled by the model's name and backend.
    pub fn new(
        model: Arc<dyn EmbeddingModel>,
        token_counter: Arc<dyn TokenCounter>,
        auth: AuthGate,
        workers: usize,
    ) -> Result<Self, prometheus::Error> {
        let labels = ModelLabels::new(model.model_name(), model.backend());
        let metrics = Arc::new(ServiceMetrics::new(labels)?);

        Ok(Self {
            inference: InferencePool::new(model, workers),
            accountant: TokenAccountant::new(token_counter, metrics.clone()),
            metrics,
            auth: Arc::new(auth),
        })
    }
}

/// Routes wrapped in the request pipeline, ready to serve
pub fn create_app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/embeddings", post(create_embeddings))
        .with_state(state.clone());

    apply_pipeline(routes, state.auth, state.metrics)
}

/// Serves `state` on `addr` until Ctrl-C
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let inference = state.inference.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    inference.close();
    info!("API server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
