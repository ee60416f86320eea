//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health on the gateway
//!     → aggregate.rs (fan out over the route table)
//!     → active.rs (probe GET <service>/health with timeout)
//!     → state.rs (healthy / unhealthy)
//!     → 200 if every service is healthy, else 503
//! ```
//!
//! # Design Decisions
//! - Probes run on demand, concurrently; no background monitor
//! - Non-2xx, connection errors and timeouts are all unhealthy

pub mod active;
pub mod aggregate;
pub mod state;

pub use aggregate::{HealthAggregator, HealthReport};
pub use state::HealthStatus;
