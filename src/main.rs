// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use langcache_embeddings_api::{
    api::{start_server, AppState, AuthGate},
    config::ServiceConfig,
    embeddings::{EmbeddingModel, HfTokenCounter, OnnxEmbeddingModel},
    version,
};
use std::{env, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    info!("{}", version::get_version_string());

    let addr = config.listen_addr()?;

    // Loading runs a validation inference, keep it off the runtime
    let model = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            OnnxEmbeddingModel::load(
                config.model_name,
                config.model_path,
                config.tokenizer_path,
                config.max_sequence_length,
            )
        })
        .await
        .context("Model loading task failed")??
    };
    let token_counter = HfTokenCounter::from_file(&config.tokenizer_path)?;

    info!(
        model = %model.model_name(),
        dimensions = model.dimension(),
        workers = config.inference_workers,
        "Embedding model ready"
    );

    let auth = AuthGate::new(config.api_key.as_deref(), config.public_paths.iter().cloned());
    if !auth.is_enforced() {
        warn!("API_KEY not set, X-Require-Auth requests will not be authenticated");
    }

    let state = AppState::new(
        Arc::new(model),
        Arc::new(token_counter),
        auth,
        config.inference_workers,
    )?;

    start_server(state, addr).await
}
