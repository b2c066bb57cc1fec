// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Opt-in bearer authentication
//!
//! Authentication is requested per request with `X-Require-Auth: true`, so
//! public and private callers can share one deployment. The gate decides, in
//! order, first match wins:
//!
//! 1. signal header absent or not exactly `true` → allow
//! 2. no credential configured → allow
//! 3. path in the public allow-list → allow
//! 4. `Authorization: Bearer <token>` with `token` equal to the credential →
//!    allow, anything else → reject with an empty 401
//!
//! A rejected request never reaches the handler, so no inference or token
//! accounting happens for it.

use crate::api::errors::ApiError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Header a client sets to opt into authentication
pub const REQUIRE_AUTH_HEADER: &str = "x-require-auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Reject,
}

/// Why a request was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("invalid bearer credential")]
    InvalidCredential,
}

/// Per-request authentication decision
#[derive(Clone)]
pub struct AuthGate {
    /// SHA-256 of the configured credential
    credential: Option<[u8; 32]>,
    public_paths: HashSet<String>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("enforced", &self.credential.is_some())
            .field("public_paths", &self.public_paths)
            .finish()
    }
}

impl AuthGate {
    /// An empty or absent credential disables enforcement
    pub fn new<I, S>(credential: Option<&str>, public_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            credential: credential.filter(|c| !c.is_empty()).map(digest),
            public_paths: public_paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.credential.is_some()
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(path)
    }

    pub fn decide(&self, headers: &HeaderMap, path: &str) -> AuthDecision {
        match self.check(headers, path) {
            Ok(()) => AuthDecision::Allow,
            Err(_) => AuthDecision::Reject,
        }
    }

    /// Like [`AuthGate::decide`] but reports the rejection reason
    pub fn check(&self, headers: &HeaderMap, path: &str) -> Result<(), AuthError> {
        let requested = headers
            .get(REQUIRE_AUTH_HEADER)
            .map(|v| v.as_bytes() == b"true")
            .unwrap_or(false);
        if !requested {
            return Ok(());
        }

        let Some(expected) = self.credential.as_ref() else {
            return Ok(());
        };

        if self.is_public(path) {
            return Ok(());
        }

        let presented = bearer_token(headers)?;
        if constant_time_eq(&digest(presented), expected) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredential)
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; the token is everything after
/// the first space, unmodified.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Comparison whose running time does not depend on the first differing byte
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Axum middleware applying an [`AuthGate`]
///
/// # Example
/// ```ignore
/// let gate = Arc::new(AuthGate::new(Some("k1"), ["/", "/health", "/metrics"]));
/// let app = Router::new()
///     .route("/v1/embeddings", post(handler))
///     .layer(middleware::from_fn_with_state(gate, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(reason) = gate.check(request.headers(), request.uri().path()) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            reason = %reason,
            "Rejected unauthenticated request"
        );
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}
