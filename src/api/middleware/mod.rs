// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod auth;
pub mod metrics;

pub use auth::{auth_middleware, AuthDecision, AuthError, AuthGate, REQUIRE_AUTH_HEADER};
pub use metrics::{metrics_middleware, OTHER_METHOD, UNMATCHED_ENDPOINT};
