//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults / config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (PORT, <NAME>_SERVICE_URL overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → route table built once, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any validation error is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_effective, ConfigError};
pub use schema::GatewayConfig;
pub use schema::HealthCheckConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ServiceConfig;
pub use schema::TimeoutConfig;
pub use validation::ValidationError;
