//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crm_gateway::config::{GatewayConfig, ServiceConfig};
use crm_gateway::{HttpServer, Shutdown};

/// Serve `app` on an ephemeral loopback port.
pub async fn start_mock_service(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[derive(Clone)]
pub struct EchoState {
    pub name: &'static str,
    pub hits: Arc<AtomicUsize>,
    pub healthy: bool,
}

/// A service that reports what it received and counts non-health hits.
pub fn echo_service(name: &'static str, healthy: bool) -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let state = EchoState {
        name,
        hits: hits.clone(),
        healthy,
    };
    let app = Router::new()
        .route("/health", get(health))
        .fallback(echo)
        .with_state(state);
    (app, hits)
}

async fn health(State(state): State<EchoState>) -> StatusCode {
    if state.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn echo(
    State(state): State<EchoState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "service": state.name,
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": body,
        "host": header("host"),
        "content_type": header("content-type"),
        "request_id": header("x-request-id"),
        "forwarded_host": header("x-forwarded-host"),
        "forwarded_for": header("x-forwarded-for"),
    }))
}

/// Gateway config pointing at the given services, with short timeouts.
pub fn gateway_config(services: Vec<ServiceConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.services = services;
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config.health_check.timeout_secs = 2;
    config
}

pub fn service(name: &str, addr: SocketAddr, prefixes: &[&str]) -> ServiceConfig {
    ServiceConfig::new(name, &format!("http://{}", addr), prefixes)
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), io::Error>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// In-memory log sink for asserting on server-side log output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}
