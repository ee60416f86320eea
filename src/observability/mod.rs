//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! proxy handler, forwarder, failure translator, health probes
//!     → logging.rs (tracing subscriber, pretty or JSON on stdout)
//!     → metrics.rs (per-service counters, latency histogram, health gauge)
//!
//! Scraped at observability.metrics_address when metrics are enabled.
//! ```
//!
//! # Design Decisions
//! - Every request log line carries the `x-request-id`
//! - Upstream error chains are logged here and never sent to clients
//! - Without an installed recorder metric calls cost nothing

pub mod logging;
pub mod metrics;
