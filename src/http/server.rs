//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, body limit)
//! - Bind server to listener
//! - Dispatch requests to the routing engine
//! - Forward requests to upstream services
//! - Aggregate upstream health
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::health::{HealthAggregator, HealthReport};
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::response::{ErrorEnvelope, NOT_FOUND, SERVICE_NOT_FOUND};
use crate::observability::metrics;
use crate::proxy::{ForwardOutcome, Forwarder};
use crate::routing::matcher::prefix_matches;
use crate::routing::{MatchResult, RouteTable, Router as ProxyRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub forwarder: Forwarder,
    pub health: HealthAggregator,
}

/// HTTP server for the API gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails only if the service table is malformed.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        let table = Arc::new(RouteTable::from_services(&config.services)?);
        let proxy_router = Arc::new(ProxyRouter::new(
            table.clone(),
            config.gateway.mount_prefix.clone(),
        ));
        let forwarder = Forwarder::new(&config.timeouts, config.gateway.mount_prefix.clone());
        let health = HealthAggregator::new(table, forwarder.client().clone(), &config.health_check);

        let state = AppState {
            router: proxy_router,
            forwarder,
            health,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mount = config.gateway.mount_prefix.as_str();

        let router = Router::new()
            .route("/health", get(health_handler))
            .route(mount, any(proxy_handler))
            .route(&format!("{}/{{*rest}}", mount), any(proxy_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.cors.enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// The fully layered router, for in-process serving and tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.config.gateway.mount_prefix,
            services = self.config.services.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Looks up the owning service and forwards the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let (service_name, route) = match state.router.match_path(&path) {
        MatchResult::Matched {
            service_name,
            route,
        } => (service_name, route),
        MatchResult::NoMatch => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, "No service found for path");
            metrics::record_route_miss();
            return ErrorEnvelope::new(SERVICE_NOT_FOUND)
                .with_path(path)
                .into_response_with(StatusCode::NOT_FOUND);
        }
    };

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        service = service_name,
        "Routing request"
    );

    let response = match state.forwarder.forward(route, request).await {
        ForwardOutcome::Relayed(response) => response,
        ForwardOutcome::Failed(failure) => failure.into_response(),
    };

    metrics::record_request(service_name, response.status().as_u16(), start_time);
    response
}

async fn health_handler(State(state): State<AppState>) -> HealthReport {
    state.health.check_all().await
}

/// Paths the explicit routes miss. Anything under the mount, such as an
/// empty `<mount>/` tail, still goes through the matcher.
async fn fallback_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if prefix_matches(state.router.mount_prefix(), request.uri().path()) {
        return proxy_handler(State(state), request).await;
    }
    ErrorEnvelope::new(NOT_FOUND).into_response_with(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use tower::ServiceExt;

    fn unreachable_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        // Port 9 (discard) on loopback: nothing listens there in test environments.
        config.services = vec![ServiceConfig::new("customer", "http://127.0.0.1:9", &["/customers"])];
        config.timeouts.connect_secs = 1;
        config.health_check.timeout_secs = 1;
        config
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_service_is_404_envelope() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/api/unknown/thing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "error", "message": "Service not found", "path": "/api/unknown/thing"})
        );
    }

    #[tokio::test]
    async fn test_mount_with_trailing_slash_uses_matcher_envelope() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        for path in ["/api", "/api/"] {
            let response = server
                .router()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                body_json(response).await,
                serde_json::json!({"status": "error", "message": "Service not found", "path": path})
            );
        }
    }

    #[tokio::test]
    async fn test_unmounted_path_is_plain_404() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/customers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "error", "message": "Not Found"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_503_envelope() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/api/customers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Service temporarily unavailable");
        assert!(!json.to_string().to_lowercase().contains("refused"));
    }

    #[tokio::test]
    async fn test_health_reports_unreachable_service() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["services"]["customer"], "unhealthy");
    }

    #[tokio::test]
    async fn test_client_request_id_is_kept() {
        let server = HttpServer::new(unreachable_config()).unwrap();
        let response = server
            .router()
            .oneshot(
                Request::get("/api/nothing")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[test]
    fn test_malformed_services_rejected() {
        let mut config = GatewayConfig::default();
        config.services = vec![ServiceConfig::new("customer", "http://localhost:3002", &[])];
        assert!(HttpServer::new(config).is_err());
    }
}
