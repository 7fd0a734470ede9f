//! In-memory metrics reader.
//!
//! Serves pre-registered metric families, filtered per request by service
//! and span kind. Intended for development and testing.

use super::context::QueryContext;
use super::metrics_reader::{
    BaseQueryParameters, CallRateQueryParameters, ErrorRateQueryParameters,
    LatenciesQueryParameters, MetricsStoreError, MinStepDurationQueryParameters, Reader,
};
use crate::models::MetricFamily;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Family name returned for latency queries with nothing registered.
pub const LATENCIES_FAMILY: &str = "service_latencies";
/// Family name returned for call rate queries with nothing registered.
pub const CALL_RATE_FAMILY: &str = "service_call_rate";
/// Family name returned for error rate queries with nothing registered.
pub const ERROR_RATE_FAMILY: &str = "service_error_rate";

/// Default minimum step reported by the in-memory reader.
pub const DEFAULT_MIN_STEP: Duration = Duration::from_millis(1);

const SERVICE_LABEL: &str = "service_name";
const SPAN_KIND_LABEL: &str = "span_kind";

#[derive(Debug, Default)]
struct Families {
    // Keyed by quantile; lookups compare exactly.
    latencies: Vec<(f64, MetricFamily)>,
    call_rates: Option<MetricFamily>,
    error_rates: Option<MetricFamily>,
}

/// In-memory metrics reader implementation.
#[derive(Debug)]
pub struct InMemoryMetricsReader {
    families: Arc<RwLock<Families>>,
    min_step: Duration,
}

impl Default for InMemoryMetricsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetricsReader {
    /// Creates a reader with no registered families.
    #[must_use]
    pub fn new() -> Self {
        Self {
            families: Arc::new(RwLock::new(Families::default())),
            min_step: DEFAULT_MIN_STEP,
        }
    }

    /// Creates a new in-memory reader wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sets the minimum step reported by the reader.
    #[must_use]
    pub fn with_min_step(mut self, min_step: Duration) -> Self {
        self.min_step = min_step;
        self
    }

    /// Registers the latency family served for a quantile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    #[allow(clippy::float_cmp)]
    pub fn set_latencies(
        &self,
        quantile: f64,
        family: MetricFamily,
    ) -> Result<(), MetricsStoreError> {
        let mut families = self.families.write().map_err(|_| lock_error())?;
        families.latencies.retain(|(q, _)| *q != quantile);
        families.latencies.push((quantile, family));
        Ok(())
    }

    /// Registers the call rate family.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn set_call_rates(&self, family: MetricFamily) -> Result<(), MetricsStoreError> {
        let mut families = self.families.write().map_err(|_| lock_error())?;
        families.call_rates = Some(family);
        Ok(())
    }

    /// Registers the error rate family.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn set_error_rates(&self, family: MetricFamily) -> Result<(), MetricsStoreError> {
        let mut families = self.families.write().map_err(|_| lock_error())?;
        families.error_rates = Some(family);
        Ok(())
    }

    /// Removes every registered family.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn clear(&self) -> Result<(), MetricsStoreError> {
        let mut families = self.families.write().map_err(|_| lock_error())?;
        *families = Families::default();
        Ok(())
    }

    fn select<F>(
        &self,
        params: &BaseQueryParameters,
        default_name: &str,
        pick: F,
    ) -> Result<MetricFamily, MetricsStoreError>
    where
        F: FnOnce(&Families) -> Option<&MetricFamily>,
    {
        let families = self.families.read().map_err(|_| lock_error())?;

        let Some(family) = pick(&*families) else {
            return Ok(MetricFamily::new(default_name));
        };

        let metrics = family
            .metrics
            .iter()
            .filter(|m| {
                // Service filter
                if !params.service_names.is_empty() {
                    match m.label(SERVICE_LABEL) {
                        Some(service) if params.service_names.iter().any(|s| s == service) => {}
                        _ => return false,
                    }
                }

                // Span kind filter
                if !params.span_kinds.is_empty() {
                    match m.label(SPAN_KIND_LABEL) {
                        Some(kind) if params.span_kinds.iter().any(|k| k.as_str() == kind) => {}
                        _ => return false,
                    }
                }

                true
            })
            .cloned()
            .collect();

        Ok(MetricFamily {
            metrics,
            ..family.clone()
        })
    }
}

fn lock_error() -> MetricsStoreError {
    MetricsStoreError::Backend("failed to acquire lock on metrics reader".to_string())
}

#[async_trait]
impl Reader for InMemoryMetricsReader {
    #[allow(clippy::float_cmp)]
    async fn get_latencies(
        &self,
        ctx: &QueryContext,
        params: &LatenciesQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.check()?;
        self.select(&params.base, LATENCIES_FAMILY, |f| {
            f.latencies
                .iter()
                .find(|(q, _)| *q == params.quantile)
                .map(|(_, family)| family)
        })
    }

    async fn get_call_rates(
        &self,
        ctx: &QueryContext,
        params: &CallRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.check()?;
        self.select(&params.base, CALL_RATE_FAMILY, |f| f.call_rates.as_ref())
    }

    async fn get_error_rates(
        &self,
        ctx: &QueryContext,
        params: &ErrorRateQueryParameters,
    ) -> Result<MetricFamily, MetricsStoreError> {
        ctx.check()?;
        self.select(&params.base, ERROR_RATE_FAMILY, |f| f.error_rates.as_ref())
    }

    async fn get_min_step_duration(
        &self,
        ctx: &QueryContext,
        _params: &MinStepDurationQueryParameters,
    ) -> Result<Duration, MetricsStoreError> {
        ctx.check()?;
        Ok(self.min_step)
    }
}
