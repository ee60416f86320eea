//! Request forwarding to upstream services.
//!
//! # Responsibilities
//! - Rewrite the path (strip mount prefix, keep query string)
//! - Forward method, end-to-end headers and the streamed body
//! - Relay the upstream response unmodified
//! - Hand transport failures to the failure translator
//!
//! # Design Decisions
//! - Stateless: the resolved route is a parameter, one pooled client is
//!   shared by every request
//! - The body is streamed, never buffered or re-serialized, so the inbound
//!   content-length or chunking survives untouched
//! - Bounded by the connect timeout and the request timeout: the response
//!   head must arrive within it, and so must every later body frame. A
//!   body that stalls longer is cut off mid-stream. No retries
//! - Dropping the returned future (client disconnect) aborts the upstream
//!   call and releases its connection

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower_http::timeout::TimeoutBody;

use crate::config::TimeoutConfig;
use crate::http::response::{is_hop_by_hop_header, strip_hop_by_hop};
use crate::proxy::failure::{translate, ForwardError, UpstreamFailure};
use crate::routing::matcher::rewrite_path_and_query;
use crate::routing::ServiceRoute;

/// Pooled HTTP/1 client used for every upstream call.
pub type HttpClient = Client<HttpConnector, Body>;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Result of one proxied call.
#[derive(Debug)]
pub enum ForwardOutcome {
    /// Upstream answered; status, headers and body are passed through.
    Relayed(Response<Body>),
    Failed(UpstreamFailure),
}

/// Forwards requests to a resolved service route.
#[derive(Clone)]
pub struct Forwarder {
    client: HttpClient,
    mount_prefix: String,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig, mount_prefix: impl Into<String>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            mount_prefix: mount_prefix.into(),
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }

    /// The shared client, also used for health probes.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Forward `request` to `route` and relay the outcome.
    pub async fn forward(&self, route: &ServiceRoute, request: Request<Body>) -> ForwardOutcome {
        let method = request.method().clone();
        let original_path = request.uri().path().to_string();
        let start = Instant::now();

        match self.try_forward(route, request).await {
            Ok(response) => {
                tracing::info!(
                    service = route.name(),
                    method = %method,
                    path = %original_path,
                    status = response.status().as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                ForwardOutcome::Relayed(response)
            }
            Err(error) => {
                ForwardOutcome::Failed(translate(route.name(), &method, &original_path, &error))
            }
        }
    }

    async fn try_forward(
        &self,
        route: &ServiceRoute,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = request.into_parts();

        let path_and_query =
            rewrite_path_and_query(&self.mount_prefix, parts.uri.path(), parts.uri.query());
        let uri = route.upstream_uri(&path_and_query)?;

        tracing::info!(
            service = route.name(),
            method = %parts.method,
            path = %parts.uri.path(),
            upstream = %uri,
            "Proxying request"
        );

        let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            copy_end_to_end_headers(&parts.headers, headers);

            let peer = parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr);
            append_forwarded_headers(&parts.headers, peer, headers);
        }
        let upstream_request = builder.body(body)?;

        let response: Response<Incoming> =
            tokio::time::timeout(self.request_timeout, self.client.request(upstream_request))
                .await
                .map_err(|_| ForwardError::Timeout(self.request_timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let body = TimeoutBody::new(self.request_timeout, body);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Copy every header except hop-by-hop ones and `Host`; the client sets
/// `Host` from the upstream URI.
fn copy_end_to_end_headers(from: &HeaderMap, to: &mut HeaderMap) {
    let connection_listed: Vec<String> = from
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();

    for (name, value) in from.iter() {
        if *name == header::HOST
            || is_hop_by_hop_header(name.as_str())
            || connection_listed.iter().any(|listed| listed == name.as_str())
        {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

fn append_forwarded_headers(original: &HeaderMap, peer: Option<SocketAddr>, to: &mut HeaderMap) {
    if let Some(addr) = peer {
        let forwarded_for = match original
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(existing) => format!("{}, {}", existing, addr.ip()),
            None => addr.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            to.insert(X_FORWARDED_FOR, value);
        }
    }

    if let Some(host) = original.get(header::HOST) {
        if !to.contains_key(&X_FORWARDED_HOST) {
            to.insert(X_FORWARDED_HOST, host.clone());
        }
    }

    if !to.contains_key(&X_FORWARDED_PROTO) {
        to.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}
