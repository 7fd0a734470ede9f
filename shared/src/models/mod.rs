//! Data models for the Lookout metrics query service.
//!
//! This module contains the result types returned by metrics queries.

pub mod metric;

pub use metric::{GaugeValue, Label, Metric, MetricFamily, MetricPoint, MetricType};
