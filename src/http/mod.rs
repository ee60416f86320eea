//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → routing (which service owns the path)
//!     → proxy (forward, relay or translate failure)
//!     → response.rs (error envelope, hop-by-hop headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, MakeRequestUuid, X_REQUEST_ID};
pub use response::ErrorEnvelope;
pub use server::HttpServer;
