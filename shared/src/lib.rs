//! Lookout Shared Library
//!
//! This crate contains the metric models, the storage reader contract, and
//! the query service used by the Lookout API server.
//!
//! # Modules
//!
//! - [`models`] - Metric family data model
//! - [`storage`] - Storage reader trait, request context, and implementations
//! - [`query`] - The metrics query service
//!
//! # Example
//!
//! ```
//! use shared::models::MetricFamily;
//! use shared::query::MetricsQueryService;
//! use shared::storage::{CallRateQueryParameters, InMemoryMetricsReader, QueryContext, Reader};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let reader = InMemoryMetricsReader::new();
//! reader
//!     .set_call_rates(MetricFamily::gauge("service_call_rate", "calls per second"))
//!     .unwrap();
//!
//! let service = MetricsQueryService::new(Some(Arc::new(reader)));
//! let ctx = QueryContext::background("doc");
//! let family = service
//!     .get_call_rates(&ctx, &CallRateQueryParameters::default())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(family.name, "service_call_rate");
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod models;
pub mod query;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
