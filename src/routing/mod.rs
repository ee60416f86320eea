//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (strip mount prefix, scan services in order)
//!     → matcher.rs (segment-boundary prefix check)
//!     → Return: Matched { service, route } or NoMatch
//!
//! Route Table (at startup):
//!     ServiceConfig[]
//!     → validate prefixes and origins
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (table order)

pub mod matcher;
pub mod router;
pub mod table;

pub use router::{MatchResult, Resolution, Router};
pub use table::{RouteTable, ServiceRoute};
