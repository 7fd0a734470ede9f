//! Metrics reader trait and query parameters.
//!
//! Provides the `Reader` trait every metrics storage backend implements, the
//! parameter objects accepted by each query, and `MetricsStoreError`.

use super::context::QueryContext;
use crate::models::MetricFamily;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics reader operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsStoreError {
    /// The query service was built without a reader.
    #[error("no reader defined for MetricsQueryService")]
    NoReader,

    /// The request context was cancelled.
    #[error("context canceled")]
    Cancelled,

    /// The request context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The backend rejected the query parameters.
    #[error("invalid query parameters: {0}")]
    InvalidParameters(String),

    /// Backend failure, reported with the backend's own message.
    #[error("{0}")]
    Backend(String),
}

impl MetricsStoreError {
    /// Returns true if this is the "no reader configured" error.
    #[must_use]
    pub fn is_no_reader(&self) -> bool {
        matches!(self, Self::NoReader)
    }
}

/// Span kind filter for metrics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Kind not specified.
    Unspecified,
    /// Internal operation.
    Internal,
    /// Server side of a synchronous request.
    Server,
    /// Client side of a synchronous request.
    Client,
    /// Producer of an asynchronous message.
    Producer,
    /// Consumer of an asynchronous message.
    Consumer,
}

impl SpanKind {
    /// Returns the canonical `SPAN_KIND_*` name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "SPAN_KIND_UNSPECIFIED",
            Self::Internal => "SPAN_KIND_INTERNAL",
            Self::Server => "SPAN_KIND_SERVER",
            Self::Client => "SPAN_KIND_CLIENT",
            Self::Producer => "SPAN_KIND_PRODUCER",
            Self::Consumer => "SPAN_KIND_CONSUMER",
        }
    }
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpanKind {
    type Err = MetricsStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SPAN_KIND_").unwrap_or(&upper);
        match name {
            "UNSPECIFIED" => Ok(Self::Unspecified),
            "INTERNAL" => Ok(Self::Internal),
            "SERVER" => Ok(Self::Server),
            "CLIENT" => Ok(Self::Client),
            "PRODUCER" => Ok(Self::Producer),
            "CONSUMER" => Ok(Self::Consumer),
            _ => Err(MetricsStoreError::InvalidParameters(format!(
                "unknown span kind: {s}"
            ))),
        }
    }
}

/// Parameters shared by latency, call rate, and error rate queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseQueryParameters {
    /// Services to query.
    pub service_names: Vec<String>,

    /// Whether to split series per operation.
    pub group_by_operation: bool,

    /// End of the queried window.
    pub end_time: Option<DateTime<Utc>>,

    /// Length of the queried window, counted back from `end_time`.
    pub lookback: Option<Duration>,

    /// Spacing between returned points.
    pub step: Option<Duration>,

    /// Interval rates are expressed per.
    pub rate_per: Option<Duration>,

    /// Span kinds to include.
    pub span_kinds: Vec<SpanKind>,
}

impl BaseQueryParameters {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service to query.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_names.push(service.into());
        self
    }

    /// Enables per-operation grouping.
    #[must_use]
    pub fn with_group_by_operation(mut self, group_by_operation: bool) -> Self {
        self.group_by_operation = group_by_operation;
        self
    }

    /// Sets the end of the queried window.
    #[must_use]
    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = Some(lookback);
        self
    }

    /// Sets the step between points.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the rate interval.
    #[must_use]
    pub fn with_rate_per(mut self, rate_per: Duration) -> Self {
        self.rate_per = Some(rate_per);
        self
    }

    /// Adds a span kind to include.
    #[must_use]
    pub fn with_span_kind(mut self, span_kind: SpanKind) -> Self {
        self.span_kinds.push(span_kind);
        self
    }
}

/// Parameters for latency queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatenciesQueryParameters {
    /// Shared parameters.
    pub base: BaseQueryParameters,
    /// Latency quantile, between 0 and 1 (e.g., 0.95).
    pub quantile: f64,
}

impl LatenciesQueryParameters {
    /// Creates latency parameters for the given quantile.
    #[must_use]
    pub fn new(base: BaseQueryParameters, quantile: f64) -> Self {
        Self { base, quantile }
    }
}

/// Parameters for call rate queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRateQueryParameters {
    /// Shared parameters.
    pub base: BaseQueryParameters,
}

/// Parameters for error rate queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRateQueryParameters {
    /// Shared parameters.
    pub base: BaseQueryParameters,
}

/// Parameters for minimum step duration queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinStepDurationQueryParameters {}

/// Trait for metrics storage readers.
///
/// Implementations execute queries against a concrete backend and must be
/// thread-safe (Send + Sync). The context's cancellation and deadline are
/// theirs to honor.
#[async_trait]
pub trait Reader: Send + Sync {
    /// Returns latency series for the requested quantile.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError>;

    /// Returns request rate series.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError>;

    /// Returns error ratio series.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError>;

    /// Returns the smallest step the backend can aggregate at.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError>;
}
