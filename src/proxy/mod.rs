//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Matched { route }
//!     → forwarder.rs (rewrite path, stream request upstream)
//!     → upstream service
//!     → Relayed(response) on any HTTP answer, including 4xx/5xx
//!     → failure.rs on transport error (log, classify, envelope)
//! ```

pub mod failure;
pub mod forwarder;

pub use failure::{FailureKind, ForwardError, UpstreamFailure};
pub use forwarder::{ForwardOutcome, Forwarder, HttpClient};
