//! Metrics query service.
//!
//! `MetricsQueryService` is the facade the API layer queries. It holds an
//! optional storage reader and forwards every call to it unchanged. A service
//! built without a reader answers every call with
//! [`MetricsStoreError::NoReader`].

use crate::models::MetricFamily;
use crate::storage::{
    CallRateQueryParameters, ErrorRateQueryParameters, LatenciesQueryParameters,
    MetricsStoreError, MinStepDurationQueryParameters, QueryContext, Reader,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Query facade over an optional metrics reader.
///
/// # Example
///
/// ```
/// use shared::query::MetricsQueryService;
/// use shared::storage::{MetricsStoreError, MinStepDurationQueryParameters, QueryContext, Reader};
///
/// # tokio_test::block_on(async {
/// let service = MetricsQueryService::new(None);
/// let ctx = QueryContext::background("example");
///
/// let result = service
///     .get_min_step_duration(&ctx, &MinStepDurationQueryParameters {})
///     .await;
///
/// assert_eq!(result, Err(MetricsStoreError::NoReader));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MetricsQueryService {
    metrics_reader: Option<Arc<dyn Reader>>,
}

impl MetricsQueryService {
    /// Creates a new service over the given reader.
    ///
    /// `None` is a supported configuration (metrics disabled).
    #[must_use]
    pub fn new(metrics_reader: Option<Arc<dyn Reader>>) -> Self {
        Self { metrics_reader }
    }

    /// Returns true if a reader is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.metrics_reader.is_some()
    }
}

impl std::fmt::Debug for MetricsQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsQueryService")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[async_trait]
impl Reader for MetricsQueryService {
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        let Some(reader) = &self.metrics_reader else {
            return Err(MetricsStoreError::NoReader);
        };
        reader.get_latencies(ctx, params).await
    }

    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        let Some(reader) = &self.metrics_reader else {
            return Err(MetricsStoreError::NoReader);
        };
        reader.get_call_rates(ctx, params).await
    }

    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        let Some(reader) = &self.metrics_reader else {
            return Err(MetricsStoreError::NoReader);
        };
        reader.get_error_rates(ctx, params).await
    }

    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError> {
        let Some(reader) = &self.metrics_reader else {
            return Err(MetricsStoreError::NoReader);
        };
        reader.get_min_step_duration(ctx, params).await
    }
}
