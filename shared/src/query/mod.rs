//! Query services exposed to the API layer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use shared::query::MetricsQueryService;
//! use shared::storage::{InMemoryMetricsReader, Reader};
//!
//! let reader: Arc<dyn Reader> = InMemoryMetricsReader::new_shared();
//! let service = MetricsQueryService::new(Some(reader));
//!
//! assert!(service.is_enabled());
//! ```

mod metrics_query_service;

pub use metrics_query_service::MetricsQueryService;
