//! Aggregate health of every upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::join_all;
use serde::ser::{Serialize, SerializeMap, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::HealthCheckConfig;
use crate::health::active::probe;
use crate::health::state::HealthStatus;
use crate::observability::metrics;
use crate::proxy::HttpClient;
use crate::routing::RouteTable;

/// Per-service statuses, serialized as a JSON object in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatuses(pub Vec<(String, HealthStatus)>);

impl ServiceStatuses {
    pub fn get(&self, name: &str) -> Option<HealthStatus> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }
}

impl Serialize for ServiceStatuses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, status) in &self.0 {
            map.serialize_entry(name, status)?;
        }
        map.end()
    }
}

/// Body of the gateway's `/health` endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub services: ServiceStatuses,
}

impl HealthReport {
    pub fn from_statuses(services: Vec<(String, HealthStatus)>) -> Self {
        let status = HealthStatus::all(services.iter().map(|(_, s)| *s));
        Self {
            status,
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            services: ServiceStatuses(services),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.status.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Probes every service in the route table.
#[derive(Clone)]
pub struct HealthAggregator {
    table: Arc<RouteTable>,
    client: HttpClient,
    path: String,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(table: Arc<RouteTable>, client: HttpClient, config: &HealthCheckConfig) -> Self {
        Self {
            table,
            client,
            path: config.path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Probe all services concurrently and build the report.
    pub async fn check_all(&self) -> HealthReport {
        let probes = self.table.all().map(|(name, route)| async move {
            let status = probe(&self.client, route, &self.path, self.timeout).await;
            metrics::record_service_health(name, status.is_healthy());
            (name.to_string(), status)
        });

        let report = HealthReport::from_statuses(join_all(probes).await);

        if !report.status.is_healthy() {
            tracing::warn!(services = ?report.services, "Gateway unhealthy");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HealthStatus::*;

    #[test]
    fn test_report_all_healthy() {
        let report = HealthReport::from_statuses(vec![
            ("user".into(), Healthy),
            ("customer".into(), Healthy),
        ]);
        assert_eq!(report.status, Healthy);
        assert_eq!(report.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_report_one_unhealthy() {
        let report = HealthReport::from_statuses(vec![
            ("user".into(), Healthy),
            ("customer".into(), Healthy),
            ("sales".into(), Unhealthy),
        ]);
        assert_eq!(report.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(
            json["services"],
            serde_json::json!({"user": "healthy", "customer": "healthy", "sales": "unhealthy"})
        );
        assert!(OffsetDateTime::parse(json["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[test]
    fn test_services_serialize_in_table_order() {
        let statuses = ServiceStatuses(vec![("sales".into(), Healthy), ("customer".into(), Unhealthy)]);
        assert_eq!(
            serde_json::to_string(&statuses).unwrap(),
            r#"{"sales":"healthy","customer":"unhealthy"}"#
        );
        assert_eq!(statuses.get("customer"), Some(Unhealthy));
    }
}
