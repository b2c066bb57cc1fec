// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prometheus metrics for the embeddings service
//!
//! All collectors live in a [`ServiceMetrics`] instance that owns its own
//! [`Registry`]. The instance is created once at startup and handed to the
//! HTTP layer through application state, so tests can build a fresh one per
//! case instead of sharing process-wide globals.
//!
//! Exposed series:
//! - `http_requests_total` (counter)
//! - `http_request_duration_milliseconds` (histogram)
//! - `prompt_tokens_length` (histogram)

use prometheus::proto::Metric;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Bucket bounds for prompt token counts.
///
/// The model's maximum context length is 8192 tokens, so the buckets double
/// from 10 up to 5120 with everything larger falling into `+Inf`.
pub const PROMPT_TOKEN_BUCKETS: [f64; 10] = [
    10.0, 20.0, 40.0, 80.0, 160.0, 320.0, 640.0, 1280.0, 2560.0, 5120.0,
];

/// Bucket bounds for request latency, in milliseconds
pub const LATENCY_BUCKETS_MS: [f64; 14] = [
    5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

const REQUEST_LABELS: [&str; 5] = [
    "method",
    "endpoint",
    "status_code",
    "model_name",
    "inference_backend",
];

/// Model identity attached to every series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelLabels {
    pub model_name: String,
    pub inference_backend: String,
}

impl ModelLabels {
    pub fn new(model_name: impl Into<String>, inference_backend: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            inference_backend: inference_backend.into(),
        }
    }
}

/// Label set for one request observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels<'a> {
    pub method: &'a str,
    pub endpoint: &'a str,
    pub status_code: u16,
}

/// Registry plus the collectors the service records into
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    labels: ModelLabels,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    prompt_tokens: HistogramVec,
}

impl std::fmt::Debug for ServiceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMetrics")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl ServiceMetrics {
    /// Creates the collectors and registers them in a fresh registry
    pub fn new(labels: ModelLabels) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP Requests Count"),
            &REQUEST_LABELS,
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_milliseconds", "HTTP Request Latency")
                .buckets(LATENCY_BUCKETS_MS.to_vec()),
            &REQUEST_LABELS,
        )?;

        let prompt_tokens = HistogramVec::new(
            HistogramOpts::new("prompt_tokens_length", "Number of tokens in a prompt")
                .buckets(PROMPT_TOKEN_BUCKETS.to_vec()),
            &["model_name", "inference_backend"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(prompt_tokens.clone()))?;

        Ok(Self {
            registry,
            labels,
            requests_total,
            request_duration,
            prompt_tokens,
        })
    }

    pub fn model_labels(&self) -> &ModelLabels {
        &self.labels
    }

    /// Records one finished request: a counter increment and a latency
    /// observation under the same label set.
    pub fn observe_request(&self, request: &RequestLabels<'_>, duration_ms: u64) {
        let status = request.status_code.to_string();
        let values = [
            request.method,
            request.endpoint,
            status.as_str(),
            self.labels.model_name.as_str(),
            self.labels.inference_backend.as_str(),
        ];

        self.requests_total.with_label_values(&values).inc();
        self.request_duration
            .with_label_values(&values)
            .observe(duration_ms as f64);
    }

    /// Records the total token count of one embedding request
    pub fn observe_prompt_tokens(&self, count: usize) {
        self.prompt_tokens
            .with_label_values(&[
                self.labels.model_name.as_str(),
                self.labels.inference_backend.as_str(),
            ])
            .observe(count as f64);
    }

    /// Current value of the request counter for one label set.
    ///
    /// Reads from a registry snapshot, so querying a label set that was never
    /// observed does not create a series.
    pub fn request_count(&self, request: &RequestLabels<'_>) -> u64 {
        let status = request.status_code.to_string();
        self.find_metric("http_requests_total", &self.request_label_pairs(request, &status))
            .map(|metric| metric.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    /// Number of latency observations and their sum for one label set
    pub fn request_latency(&self, request: &RequestLabels<'_>) -> (u64, f64) {
        let status = request.status_code.to_string();
        self.find_metric(
            "http_request_duration_milliseconds",
            &self.request_label_pairs(request, &status),
        )
        .map(|metric| {
            let histogram = metric.get_histogram();
            (histogram.get_sample_count(), histogram.get_sample_sum())
        })
        .unwrap_or((0, 0.0))
    }

    /// Number of prompt token observations and their sum
    pub fn prompt_token_stats(&self) -> (u64, f64) {
        let pairs = [
            ("model_name", self.labels.model_name.as_str()),
            ("inference_backend", self.labels.inference_backend.as_str()),
        ];
        self.find_metric("prompt_tokens_length", &pairs)
            .map(|metric| {
                let histogram = metric.get_histogram();
                (histogram.get_sample_count(), histogram.get_sample_sum())
            })
            .unwrap_or((0, 0.0))
    }

    fn request_label_pairs<'a>(
        &'a self,
        request: &RequestLabels<'a>,
        status: &'a str,
    ) -> [(&'a str, &'a str); 5] {
        [
            ("method", request.method),
            ("endpoint", request.endpoint),
            ("status_code", status),
            ("model_name", self.labels.model_name.as_str()),
            ("inference_backend", self.labels.inference_backend.as_str()),
        ]
    }

    /// The series of family `name` whose labels are exactly `pairs`
    fn find_metric(&self, name: &str, pairs: &[(&str, &str)]) -> Option<Metric> {
        self.registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?
            .take_metric()
            .into_iter()
            .find(|metric| {
                let labels = metric.get_label();
                labels.len() == pairs.len()
                    && pairs.iter().all(|(key, value)| {
                        labels
                            .iter()
                            .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                    })
            })
    }

    /// Renders every registered collector in the text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`ServiceMetrics::render`] output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
