//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::{Config, MetricsStorage};
use shared::query::MetricsQueryService;
use shared::storage::{InMemoryMetricsReader, QueryContext, Reader, TracedMetricsReader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The metrics query facade.
    metrics_query_service: MetricsQueryService,
    /// Deadline applied to each query context.
    query_timeout: Option<Duration>,
    /// Source of request ids for requests without `x-request-id`.
    next_request_id: Arc<AtomicU64>,
    /// Store behind the service when the `memory` backend is configured.
    memory_reader: Option<Arc<InMemoryMetricsReader>>,
}

impl AppState {
    /// Creates a new application state around the given service.
    #[must_use]
    pub fn new(metrics_query_service: MetricsQueryService, query_timeout: Option<Duration>) -> Self {
        Self {
            metrics_query_service,
            query_timeout,
            next_request_id: Arc::new(AtomicU64::new(1)),
            memory_reader: None,
        }
    }

    /// Creates the application state described by the configuration.
    ///
    /// Readers are wrapped in a `TracedMetricsReader` so every backend call
    /// is logged. The `memory` backend starts empty; families are registered
    /// through [`AppState::memory_reader`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let memory_reader = match config.metrics_storage {
            MetricsStorage::None => None,
            MetricsStorage::Memory => Some(InMemoryMetricsReader::new_shared()),
        };
        let reader = memory_reader.clone().map(|store| {
            let reader: Arc<dyn Reader> = TracedMetricsReader::new_shared(store);
            reader
        });

        tracing::info!(
            metrics_storage = ?config.metrics_storage,
            metrics_enabled = reader.is_some(),
            "Metrics query service configured"
        );

        Self {
            memory_reader,
            ..Self::new(MetricsQueryService::new(reader), config.query_timeout)
        }
    }

    /// Creates a state whose service has no reader.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(MetricsQueryService::new(None), None)
    }

    /// Creates a state whose service queries the given reader.
    #[must_use]
    pub fn with_reader(reader: Arc<dyn Reader>) -> Self {
        Self::new(MetricsQueryService::new(Some(reader)), None)
    }

    /// Returns a reference to the metrics query service.
    #[must_use]
    pub fn metrics_query_service(&self) -> &MetricsQueryService {
        &self.metrics_query_service
    }

    /// Returns the in-memory store backing the service, if configured.
    #[must_use]
    pub fn memory_reader(&self) -> Option<&Arc<InMemoryMetricsReader>> {
        self.memory_reader.as_ref()
    }

    /// Returns the per-query timeout.
    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Builds the context for one request.
    ///
    /// Uses the caller's request id when given, otherwise a generated one.
    #[must_use]
    pub fn query_context(&self, request_id: Option<&str>) -> QueryContext {
        let request_id = request_id.map_or_else(
            || {
                format!(
                    "req-{}",
                    self.next_request_id.fetch_add(1, Ordering::Relaxed)
                )
            },
            str::to_string,
        );

        let ctx = QueryContext::background(request_id);
        match self.query_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::disabled()
    }
}
