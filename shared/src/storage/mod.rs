//! Metrics storage reader contract and implementations.
//!
//! The `Reader` trait defines the interface every metrics backend implements.
//! `InMemoryMetricsReader` serves registered families for development and
//! testing, and `TracedMetricsReader` decorates any reader with logging.

pub mod context;
pub mod memory_reader;
pub mod metrics_reader;
pub mod traced_reader;

pub use context::{CancelHandle, QueryContext};
pub use memory_reader::InMemoryMetricsReader;
pub use metrics_reader::{
    BaseQueryParameters, CallRateQueryParameters, ErrorRateQueryParameters,
    LatenciesQueryParameters, MetricsStoreError, MinStepDurationQueryParameters, Reader, SpanKind,
};
pub use traced_reader::TracedMetricsReader;
