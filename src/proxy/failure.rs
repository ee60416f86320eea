//! Upstream failure translation.
//!
//! Transport-level failures stop here: the full error chain is logged, the
//! client receives the uniform envelope with no connection internals.

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::time::Duration;

use axum::{
    http::{uri::InvalidUri, Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::{ErrorEnvelope, SERVICE_UNAVAILABLE};
use crate::observability::metrics;

/// Errors raised while forwarding to an upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
}

/// Coarse failure classification exposed to metrics and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS failure or connect timeout.
    Unreachable,
    Timeout,
    Transport,
}

impl FailureKind {
    pub fn classify(error: &ForwardError) -> Self {
        match error {
            ForwardError::Transport(e) if e.is_connect() => FailureKind::Unreachable,
            ForwardError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Transport,
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            FailureKind::Unreachable | FailureKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
        }
    }
}

/// A translated failure, safe to show to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub kind: FailureKind,
    pub message: String,
    pub path: String,
}

impl IntoResponse for UpstreamFailure {
    fn into_response(self) -> Response {
        ErrorEnvelope::new(self.message)
            .with_path(self.path)
            .into_response_with(self.kind.status())
    }
}

/// Log `error` in full and reduce it to a client-safe failure.
pub fn translate(service: &str, method: &Method, path: &str, error: &ForwardError) -> UpstreamFailure {
    let kind = FailureKind::classify(error);

    tracing::error!(
        service,
        method = %method,
        path,
        kind = kind.as_str(),
        error = %error_chain(error),
        "Upstream request failed"
    );
    metrics::record_upstream_failure(service, kind.as_str());

    UpstreamFailure {
        kind,
        message: SERVICE_UNAVAILABLE.to_string(),
        path: path.to_string(),
    }
}

/// Render an error with all of its sources, e.g.
/// `client error (Connect): tcp connect error: Connection refused`.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(rendered, ": {}", cause);
        source = cause.source();
    }
    rendered
}
