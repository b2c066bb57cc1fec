// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! OpenAI-compatible embeddings endpoint
//!
//! `POST /v1/embeddings` accepts a single string or a list of strings and
//! returns one embedding per input, in input order, with token usage.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::create_embeddings;
pub use request::{EmbeddingInput, EmbeddingRequest, EncodingFormat};
pub use response::{EmbeddingData, EmbeddingVector, EmbeddingsResponse, Usage};
