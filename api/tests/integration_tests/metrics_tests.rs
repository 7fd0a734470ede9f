//! Integration tests for the metrics query endpoints.
//!
//! Tests cover:
//! - The "metrics unavailable" answer when no reader is configured
//! - Latency, call rate, error rate, and minimum step queries
//! - Parameter validation and defaults
//! - Backend errors, timeouts, and request id propagation

use axum::http::StatusCode;
use shared::query::MetricsQueryService;
use std::sync::Arc;
use std::time::Duration;

use super::common::{
    get, get_with_request_id, seeded_reader, test_app_disabled, test_app_with_reader,
    FailingReader, SlowReader,
};
use api::{create_router, AppState};

const NO_READER_MESSAGE: &str = "no reader defined for MetricsQueryService";

#[tokio::test]
async fn test_every_endpoint_reports_metrics_unavailable_without_reader() {
    let (app, _state) = test_app_disabled();

    for uri in [
        "/api/metrics/latencies?service=frontend&quantile=0.95",
        "/api/metrics/calls?service=frontend",
        "/api/metrics/errors?service=frontend",
        "/api/metrics/minstep",
    ] {
        let (status, response) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{uri}");
        assert_eq!(response["error"], "metrics_unavailable", "{uri}");
        assert_eq!(response["message"], NO_READER_MESSAGE, "{uri}");
    }
}

#[tokio::test]
async fn test_query_latencies() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(
        app,
        "/api/metrics/latencies?service=frontend&quantile=0.95&lookback=3600000&step=60000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["name"], "service_latencies");
    assert_eq!(response["type"], "gauge");

    let metrics = response["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["labels"][0]["name"], "service_name");
    assert_eq!(metrics[0]["labels"][0]["value"], "frontend");
    assert_eq!(metrics[0]["metric_points"][0]["gauge_value"], 250.0);
}

#[tokio::test]
async fn test_query_latencies_unregistered_quantile_is_empty() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) =
        get(app, "/api/metrics/latencies?service=frontend&quantile=0.5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["name"], "service_latencies");
    assert!(response["metrics"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_call_rates_defaults_to_server_spans() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(app.clone(), "/api/metrics/calls?service=frontend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["name"], "service_call_rate");
    assert_eq!(response["metrics"].as_array().unwrap().len(), 1);

    let (status, response) = get(
        app,
        "/api/metrics/calls?service=frontend&span_kind=server,client",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["metrics"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_query_call_rates_multiple_services() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let uri = format!(
        "/api/metrics/calls?service={}",
        urlencoding::encode("frontend,driver")
    );
    let (status, response) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["metrics"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_query_error_rates() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(
        app,
        "/api/metrics/errors?service=frontend&group_by_operation=true",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["name"], "service_error_rate");
    let metrics = response["metrics"].as_array().unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["labels"][2]["name"], "operation");
    assert_eq!(metrics[0]["labels"][2]["value"], "/dispatch");
}

#[tokio::test]
async fn test_query_min_step() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(app, "/api/metrics/minstep").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["min_step_ms"], 5000);
}

#[tokio::test]
async fn test_missing_service_is_rejected() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(app, "/api/metrics/calls").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_parameters");
}

#[tokio::test]
async fn test_latencies_require_quantile() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    let (status, response) = get(app, "/api/metrics/latencies?service=frontend").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Parameter 'quantile' is required");
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() {
    let (app, _state) = test_app_with_reader(seeded_reader());

    for uri in [
        "/api/metrics/latencies?service=frontend&quantile=1.5",
        "/api/metrics/latencies?service=frontend&quantile=high",
        "/api/metrics/latencies?service=frontend&quantile=NaN",
        "/api/metrics/latencies?service=frontend&quantile=inf",
        "/api/metrics/calls?service=frontend&step=0",
        "/api/metrics/calls?service=frontend&span_kind=database",
        "/api/metrics/errors?service=frontend&group_by_operation=maybe",
    ] {
        let (status, _response) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_backend_error_message_is_unchanged() {
    let (app, _state) = test_app_with_reader(Arc::new(FailingReader::new("backend timeout")));

    let (status, response) = get(app, "/api/metrics/errors?service=frontend").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["error"], "storage_error");
    assert_eq!(response["message"], "backend timeout");
}

#[tokio::test]
async fn test_request_id_reaches_reader() {
    let reader = Arc::new(FailingReader::new("storage unavailable"));
    let (app, _state) = test_app_with_reader(reader.clone());

    let _ = get_with_request_id(app.clone(), "/api/metrics/minstep", "trace-abc").await;
    let _ = get(app, "/api/metrics/minstep").await;

    let ids = reader.request_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "trace-abc");
    assert!(ids[1].starts_with("req-"));
}

#[tokio::test]
async fn test_query_timeout_returns_504() {
    let service = MetricsQueryService::new(Some(Arc::new(SlowReader)));
    let state = AppState::new(service, Some(Duration::from_millis(50)));
    let app = create_router(state);

    let (status, response) = get(app, "/api/metrics/calls?service=frontend").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response["error"], "timeout");
    assert_eq!(response["message"], "context deadline exceeded");
}
