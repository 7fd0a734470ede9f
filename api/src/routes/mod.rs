//! API route definitions.
//!
//! This module organizes all HTTP routes for the Lookout API server.

mod health;
mod metrics;

pub use health::health_routes;
pub use metrics::{metrics_routes, REQUEST_ID_HEADER};
