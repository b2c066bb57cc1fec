// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file is loaded first by the binary).

use crate::inference::DEFAULT_INFERENCE_WORKERS;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL_NAME: &str = "redis/langcache-embed-v1";

/// Paths reachable without a credential even when auth is requested
pub const DEFAULT_PUBLIC_PATHS: [&str; 3] = ["/", "/health", "/metrics"];

#[derive(Parser, Debug, Clone)]
#[command(name = "langcache-embeddings-api")]
#[command(about = "OpenAI-compatible embeddings API", long_about = None)]
pub struct ServiceConfig {
    /// Bearer credential; empty disables enforcement
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 11434)]
    pub port: u16,

    /// Model identity reported by `/` and attached to metrics
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    #[arg(long, env = "MODEL_PATH", default_value = "./models/langcache-embed-v1/model.onnx")]
    pub model_path: PathBuf,

    #[arg(
        long,
        env = "TOKENIZER_PATH",
        default_value = "./models/langcache-embed-v1/tokenizer.json"
    )]
    pub tokenizer_path: PathBuf,

    /// Maximum sequence length fed to the model
    #[arg(long, env = "MAX_SEQUENCE_LENGTH", default_value_t = 8192)]
    pub max_sequence_length: usize,

    /// Batches computed concurrently
    #[arg(long, env = "INFERENCE_WORKERS", default_value_t = DEFAULT_INFERENCE_WORKERS)]
    pub inference_workers: usize,

    /// Comma separated paths that never require a credential
    #[arg(
        long,
        env = "PUBLIC_PATHS",
        value_delimiter = ',',
        default_values = DEFAULT_PUBLIC_PATHS
    )]
    pub public_paths: Vec<String>,
}

impl ServiceConfig {
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }
}
