//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, stub readers, and HTTP request helpers.

use api::{create_router, AppState, REQUEST_ID_HEADER};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use shared::models::{Metric, MetricFamily, MetricPoint};
use shared::storage::{
    CallRateQueryParameters, ErrorRateQueryParameters, InMemoryMetricsReader,
    LatenciesQueryParameters, MetricsStoreError, MinStepDurationQueryParameters, QueryContext,
    Reader,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates a test router whose service has no reader.
pub fn test_app_disabled() -> (Router, AppState) {
    let state = AppState::disabled();
    let router = create_router(state.clone());
    (router, state)
}

/// Creates a test router over the given reader.
pub fn test_app_with_reader(reader: Arc<dyn Reader>) -> (Router, AppState) {
    let state = AppState::with_reader(reader);
    let router = create_router(state.clone());
    (router, state)
}

fn series(service: &str, span_kind: &str, operation: Option<&str>, value: f64) -> Metric {
    let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    let mut metric = Metric::new()
        .with_label("service_name", service)
        .with_label("span_kind", span_kind);
    if let Some(operation) = operation {
        metric = metric.with_label("operation", operation);
    }
    metric.with_point(MetricPoint::double(ts, value))
}

/// Creates an in-memory reader seeded with families for two services.
pub fn seeded_reader() -> Arc<InMemoryMetricsReader> {
    let reader = InMemoryMetricsReader::new().with_min_step(Duration::from_secs(5));

    reader
        .set_latencies(
            0.95,
            MetricFamily::gauge("service_latencies", "0.95th quantile latency, grouped by service")
                .with_metric(series("frontend", "SPAN_KIND_SERVER", None, 250.0))
                .with_metric(series("driver", "SPAN_KIND_SERVER", None, 40.0)),
        )
        .unwrap();
    reader
        .set_call_rates(
            MetricFamily::gauge("service_call_rate", "calls/sec, grouped by service")
                .with_metric(series("frontend", "SPAN_KIND_SERVER", None, 12.0))
                .with_metric(series("frontend", "SPAN_KIND_CLIENT", None, 30.0))
                .with_metric(series("driver", "SPAN_KIND_SERVER", None, 3.0)),
        )
        .unwrap();
    reader
        .set_error_rates(
            MetricFamily::gauge("service_error_rate", "error rate, computed as a fraction of errors/sec over calls/sec")
                .with_metric(series("frontend", "SPAN_KIND_SERVER", Some("/dispatch"), 0.05)),
        )
        .unwrap();

    Arc::new(reader)
}

/// Reader that fails every call with a fixed error and records request ids.
#[derive(Default)]
pub struct FailingReader {
    pub message: String,
    pub request_ids: Mutex<Vec<String>>,
}

impl FailingReader {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            request_ids: Mutex::new(Vec::new()),
        }
    }

    fn fail<T>(&self, ctx: &QueryContext) -> Result<T, MetricsStoreError> {
        self.request_ids
            .lock()
            .unwrap()
            .push(ctx.request_id().to_string());
        Err(MetricsStoreError::Backend(self.message.clone()))
    }
}

#[async_trait]
impl Reader for FailingReader {
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        _params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        self.fail(ctx)
    }

    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        _params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        self.fail(ctx)
    }

    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        _params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        self.fail(ctx)
    }

    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        _params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError> {
        self.fail(ctx)
    }
}

/// Reader that only answers after a long delay, honoring the context.
pub struct SlowReader;

#[async_trait]
impl Reader for SlowReader {
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        _params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(MetricFamily::new("service_latencies"))
        })
        .await
    }

    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        _params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(MetricFamily::new("service_call_rate"))
        })
        .await
    }

    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        _params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(MetricFamily::new("service_error_rate"))
        })
        .await
    }

    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        _params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError> {
        ctx.run(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Duration::from_millis(1))
        })
        .await
    }
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().method("GET").uri(uri)).await
}

/// Helper to make a GET request carrying an `x-request-id` header.
pub async fn get_with_request_id(app: Router, uri: &str, request_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(REQUEST_ID_HEADER, request_id),
    )
    .await
}

async fn send(app: Router, request: axum::http::request::Builder) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}
