//! Active health probing.
//!
//! # Responsibilities
//! - Probe one upstream's health endpoint
//! - Reduce the outcome to healthy / unhealthy

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};

use crate::health::state::HealthStatus;
use crate::proxy::HttpClient;
use crate::routing::ServiceRoute;

/// GET `<base_url><path>`; only a 2xx answer within `timeout` is healthy.
pub async fn probe(
    client: &HttpClient,
    route: &ServiceRoute,
    path: &str,
    timeout: Duration,
) -> HealthStatus {
    let service = route.name();

    let uri = match route.upstream_uri(path) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(service, path, error = %e, "Failed to build health check uri");
            return HealthStatus::Unhealthy;
        }
    };

    let request = match Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::USER_AGENT, "crm-gateway-health-check")
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(service, "Failed to build health check request: {}", e);
            return HealthStatus::Unhealthy;
        }
    };

    match tokio::time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            if response.status().is_success() {
                HealthStatus::Healthy
            } else {
                tracing::warn!(service, status = %response.status(), "Health check failed: non-success status");
                HealthStatus::Unhealthy
            }
        }
        Ok(Err(e)) => {
            tracing::error!(
                service,
                error = %crate::proxy::failure::error_chain(&e),
                "Health check failed: connection error"
            );
            HealthStatus::Unhealthy
        }
        Err(_) => {
            tracing::warn!(service, timeout = ?timeout, "Health check failed: timeout");
            HealthStatus::Unhealthy
        }
    }
}
