//! Service metrics query endpoints.
//!
//! Translates HTTP query strings into reader parameters, calls the
//! `MetricsQueryService`, and maps its errors onto status codes. Parameter
//! defaults and validation live here; the service forwards whatever it is
//! given.

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::MetricFamily;
use shared::storage::{
    BaseQueryParameters, CallRateQueryParameters, ErrorRateQueryParameters,
    LatenciesQueryParameters, MetricsStoreError, MinStepDurationQueryParameters, Reader, SpanKind,
};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Header carrying a caller-chosen request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DEFAULT_LOOKBACK_MS: u64 = 60 * 60 * 1000;
const DEFAULT_STEP_MS: u64 = 5 * 1000;
const DEFAULT_RATE_PER_MS: u64 = 10 * 60 * 1000;

/// Query string accepted by the metrics endpoints.
///
/// Durations are in milliseconds; `service` and `span_kind` are
/// comma-separated lists.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MetricsQueryParams {
    pub service: Option<String>,
    #[validate(
        custom(function = "validate_quantile"),
        range(min = 0.0, max = 1.0, message = "Quantile must be between 0 and 1")
    )]
    pub quantile: Option<f64>,
    #[serde(default)]
    pub group_by_operation: bool,
    pub end_ts: Option<i64>,
    #[validate(range(min = 1, message = "Lookback must be positive"))]
    pub lookback: Option<u64>,
    #[validate(range(min = 1, message = "Step must be positive"))]
    pub step: Option<u64>,
    #[validate(range(min = 1, message = "Rate interval must be positive"))]
    pub rate_per: Option<u64>,
    pub span_kind: Option<String>,
}

fn validate_quantile(quantile: f64) -> Result<(), ValidationError> {
    // NaN slips past range comparisons.
    if quantile.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("quantile");
        err.message = Some("Quantile must be a finite number".into());
        Err(err)
    }
}

/// Errors raised while turning a query string into reader parameters.
#[derive(Debug, Error)]
pub enum QueryParamError {
    /// No service name was given.
    #[error("At least one service name is required")]
    MissingService,

    /// A latency query without a quantile.
    #[error("Parameter 'quantile' is required")]
    MissingQuantile,

    /// The end timestamp is outside the representable range.
    #[error("Invalid end_ts: {0}")]
    InvalidEndTs(i64),

    /// An unknown span kind.
    #[error("{0}")]
    InvalidSpanKind(MetricsStoreError),

    /// Field validation failed.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn split_list(value: Option<&str>) -> Vec<&str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl MetricsQueryParams {
    /// Builds the shared reader parameters, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a field fails validation, no service is named,
    /// `end_ts` is out of range, or a span kind is unknown.
    pub fn to_base(&self) -> Result<BaseQueryParameters, QueryParamError> {
        self.validate()?;

        let service_names: Vec<String> = split_list(self.service.as_deref())
            .into_iter()
            .map(String::from)
            .collect();
        if service_names.is_empty() {
            return Err(QueryParamError::MissingService);
        }

        let end_time = match self.end_ts {
            Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
                .ok_or(QueryParamError::InvalidEndTs(ms))?,
            None => Utc::now(),
        };

        let mut span_kinds = split_list(self.span_kind.as_deref())
            .into_iter()
            .map(str::parse::<SpanKind>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(QueryParamError::InvalidSpanKind)?;
        if span_kinds.is_empty() {
            span_kinds.push(SpanKind::Server);
        }

        Ok(BaseQueryParameters {
            service_names,
            group_by_operation: self.group_by_operation,
            end_time: Some(end_time),
            lookback: Some(Duration::from_millis(
                self.lookback.unwrap_or(DEFAULT_LOOKBACK_MS),
            )),
            step: Some(Duration::from_millis(self.step.unwrap_or(DEFAULT_STEP_MS))),
            rate_per: Some(Duration::from_millis(
                self.rate_per.unwrap_or(DEFAULT_RATE_PER_MS),
            )),
            span_kinds,
        })
    }
}

/// Response for the minimum step query.
#[derive(Debug, Serialize, Deserialize)]
pub struct MinStepResponse {
    pub min_step_ms: u64,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct MetricError {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<MetricError>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(MetricError {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

fn param_error(err: &QueryParamError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "invalid_parameters", err.to_string())
}

fn store_error(err: &MetricsStoreError) -> ApiError {
    let (status, code) = match err {
        MetricsStoreError::NoReader => (StatusCode::NOT_IMPLEMENTED, "metrics_unavailable"),
        MetricsStoreError::InvalidParameters(_) => (StatusCode::BAD_REQUEST, "invalid_parameters"),
        MetricsStoreError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        MetricsStoreError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
        MetricsStoreError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Metrics storage error");
    }

    api_error(status, code, err.to_string())
}

fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Creates the metrics routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/metrics/latencies", get(get_latencies))
        .route("/api/metrics/calls", get(get_call_rates))
        .route("/api/metrics/errors", get(get_error_rates))
        .route("/api/metrics/minstep", get(get_min_step))
        .with_state(state)
}

async fn get_latencies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MetricsQueryParams>,
) -> Result<Json<MetricFamily>, ApiError> {
    let base = params.to_base().map_err(|e| param_error(&e))?;
    let quantile = params
        .quantile
        .ok_or_else(|| param_error(&QueryParamError::MissingQuantile))?;

    let ctx = state.query_context(request_id(&headers));
    let family = state
        .metrics_query_service()
        .get_latencies(&ctx, &LatenciesQueryParameters::new(base, quantile))
        .await
        .map_err(|e| store_error(&e))?;

    Ok(Json(family))
}

async fn get_call_rates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MetricsQueryParams>,
) -> Result<Json<MetricFamily>, ApiError> {
    let base = params.to_base().map_err(|e| param_error(&e))?;

    let ctx = state.query_context(request_id(&headers));
    let family = state
        .metrics_query_service()
        .get_call_rates(&ctx, &CallRateQueryParameters { base })
        .await
        .map_err(|e| store_error(&e))?;

    Ok(Json(family))
}

async fn get_error_rates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MetricsQueryParams>,
) -> Result<Json<MetricFamily>, ApiError> {
    let base = params.to_base().map_err(|e| param_error(&e))?;

    let ctx = state.query_context(request_id(&headers));
    let family = state
        .metrics_query_service()
        .get_error_rates(&ctx, &ErrorRateQueryParameters { base })
        .await
        .map_err(|e| store_error(&e))?;

    Ok(Json(family))
}

async fn get_min_step(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MinStepResponse>, ApiError> {
    let ctx = state.query_context(request_id(&headers));
    let min_step = state
        .metrics_query_service()
        .get_min_step_duration(&ctx, &MinStepDurationQueryParameters {})
        .await
        .map_err(|e| store_error(&e))?;

    Ok(Json(MinStepResponse {
        min_step_ms: u64::try_from(min_step.as_millis()).unwrap_or(u64::MAX),
    }))
}
