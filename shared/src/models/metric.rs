//! Metric family data model.
//!
//! Defines the `MetricFamily` structure returned by latency, call rate, and
//! error rate queries. A family is a named group of time series, each series
//! identified by its labels and carrying a list of timestamped points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of the metrics in a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// The type was not reported by the backend.
    #[default]
    Unknown,
    /// A value that can go up or down (e.g., a latency percentile).
    Gauge,
    /// A value that only increases (e.g., total request count).
    Counter,
    /// A bucketed distribution.
    Histogram,
    /// Pre-computed quantiles over a sliding window.
    Summary,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Gauge => write!(f, "gauge"),
            Self::Counter => write!(f, "counter"),
            Self::Histogram => write!(f, "histogram"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

/// A single name/value label identifying a time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// The label name (e.g., "`service_name`").
    pub name: String,
    /// The label value.
    pub value: String,
}

impl Label {
    /// Creates a new label.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The value of a gauge point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GaugeValue {
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Double(f64),
}

impl GaugeValue {
    /// Returns the value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Double(v) => *v,
        }
    }
}

/// A timestamped sample of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// The sampled value.
    pub gauge_value: GaugeValue,
}

impl MetricPoint {
    /// Creates a floating point sample.
    #[must_use]
    pub fn double(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            gauge_value: GaugeValue::Double(value),
        }
    }

    /// Creates an integer sample.
    #[must_use]
    pub fn int(timestamp: DateTime<Utc>, value: i64) -> Self {
        Self {
            timestamp,
            gauge_value: GaugeValue::Int(value),
        }
    }
}

/// One time series within a family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Labels identifying this series.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// The samples of this series, oldest first.
    #[serde(default)]
    pub metric_points: Vec<MetricPoint>,
}

impl Metric {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label to the series.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(Label::new(name, value));
        self
    }

    /// Appends a sample to the series.
    #[must_use]
    pub fn with_point(mut self, point: MetricPoint) -> Self {
        self.metric_points.push(point);
        self
    }

    /// Returns the value of the first label with the given name.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

/// A named collection of time series returned by a metrics query.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use shared::models::{Metric, MetricFamily, MetricPoint, MetricType};
///
/// let family = MetricFamily::gauge("service_latencies", "0.95th quantile latency")
///     .with_metric(
///         Metric::new()
///             .with_label("service_name", "frontend")
///             .with_point(MetricPoint::double(Utc::now(), 12.5)),
///     );
///
/// assert_eq!(family.metric_type, MetricType::Gauge);
/// assert_eq!(family.metrics[0].label("service_name"), Some("frontend"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    /// The family name (e.g., "`service_call_rate`").
    pub name: String,

    /// The type shared by every series in the family.
    #[serde(rename = "type", default)]
    pub metric_type: MetricType,

    /// Human readable description of the family.
    #[serde(default)]
    pub help: String,

    /// The series in this family.
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    /// Creates an empty family with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an empty gauge family.
    #[must_use]
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type: MetricType::Gauge,
            help: help.into(),
            metrics: Vec::new(),
        }
    }

    /// Adds a series to the family.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Returns true if the family holds no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
