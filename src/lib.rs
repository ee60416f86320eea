//! CRM API Gateway Library
//!
//! Routes `/api/*` traffic to the user, customer and sales services by path
//! prefix and aggregates their health.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
