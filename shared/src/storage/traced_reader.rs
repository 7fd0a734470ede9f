//! Tracing decorator for metrics readers.
//!
//! Wraps any `Reader` and emits a structured `tracing` event per call with the
//! operation, request id, elapsed time, and outcome. Results pass through
//! unchanged.

use super::context::QueryContext;
use super::metrics_reader::{
    CallRateQueryParameters, ErrorRateQueryParameters, LatenciesQueryParameters,
    MetricsStoreError, MinStepDurationQueryParameters, Reader,
};
use crate::models::MetricFamily;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A `Reader` that logs every call made to the wrapped reader.
#[derive(Clone)]
pub struct TracedMetricsReader {
    inner: Arc<dyn Reader>,
}

impl TracedMetricsReader {
    /// Wraps the given reader.
    #[must_use]
    pub fn new(inner: Arc<dyn Reader>) -> Self {
        Self { inner }
    }

    /// Wraps the given reader and returns the decorator in an Arc.
    #[must_use]
    pub fn new_shared(inner: Arc<dyn Reader>) -> Arc<Self> {
        Arc::new(Self::new(inner))
    }
}

impl std::fmt::Debug for TracedMetricsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedMetricsReader").finish_non_exhaustive()
    }
}

fn record<T>(
    operation: &'static str,
    ctx: &QueryContext,
    started: Instant,
    result: &Result<T, MetricsStoreError>,
) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(_) => tracing::debug!(
            operation,
            request_id = %ctx.request_id(),
            elapsed_ms,
            "Metrics query completed"
        ),
        Err(e) => tracing::warn!(
            operation,
            request_id = %ctx.request_id(),
            elapsed_ms,
            error = %e,
            "Metrics query failed"
        ),
    }
}

#[async_trait]
impl Reader for TracedMetricsReader {
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            services = ?params.base.service_names,
            quantile = params.quantile,
            "Querying latencies"
        );
        let started = Instant::now();
        let result = self.inner.get_latencies(ctx, params).await;
        record("get_latencies", ctx, started, &result);
        result
    }

    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            services = ?params.base.service_names,
            "Querying call rates"
        );
        let started = Instant::now();
        let result = self.inner.get_call_rates(ctx, params).await;
        record("get_call_rates", ctx, started, &result);
        result
    }

    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            services = ?params.base.service_names,
            "Querying error rates"
        );
        let started = Instant::now();
        let result = self.inner.get_error_rates(ctx, params).await;
        record("get_error_rates", ctx, started, &result);
        result
    }

    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError> {
        let started = Instant::now();
        let result = self.inner.get_min_step_duration(ctx, params).await;
        record("get_min_step_duration", ctx, started, &result);
        result
    }
}
