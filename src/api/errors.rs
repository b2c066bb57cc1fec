// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::inference::InferenceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body: `{"detail": "<message>"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Body did not deserialize into the expected request
    InvalidRequest(String),
    /// Body rejected before deserialization (size limit, content type)
    RejectedBody { status: u16, detail: String },
    Unauthorized,
    /// The embedding model failed for this batch
    ComputationFailed(String),
    TokenizationFailed(String),
    InternalError(String),
}

impl ApiError {
    /// `None` for errors rendered with an empty body
    pub fn to_response(&self) -> Option<ErrorResponse> {
        let detail = match self {
            ApiError::Unauthorized => return None,
            ApiError::RejectedBody { detail, .. } => detail.clone(),
            ApiError::InvalidRequest(msg)
            | ApiError::ComputationFailed(msg)
            | ApiError::TokenizationFailed(msg)
            | ApiError::InternalError(msg) => msg.clone(),
        };

        Some(ErrorResponse { detail })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 422,
            ApiError::RejectedBody { status, .. } => *status,
            ApiError::Unauthorized => 401,
            ApiError::ComputationFailed(_)
            | ApiError::TokenizationFailed(_)
            | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::RejectedBody { status, detail } => {
                write!(f, "Rejected request body ({}): {}", status, detail)
            }
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::ComputationFailed(msg) => write!(f, "Embedding computation failed: {}", msg),
            ApiError::TokenizationFailed(msg) => write!(f, "Tokenization failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        ApiError::ComputationFailed(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                ApiError::InvalidRequest(rejection.body_text())
            }
            other => ApiError::RejectedBody {
                status: other.status().as_u16(),
                detail: other.body_text(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.to_response() {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}
