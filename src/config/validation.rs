//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every service has a usable origin and well-formed prefixes
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("gateway.mount_prefix '{prefix}' {reason}")]
    InvalidMountPrefix { prefix: String, reason: &'static str },

    #[error("no services configured")]
    NoServices,

    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{service}' has invalid url '{url}': {reason}")]
    InvalidUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("service '{0}' owns no prefixes")]
    NoPrefixes(String),

    #[error("service '{service}' prefix '{prefix}' {reason}")]
    InvalidPrefix {
        service: String,
        prefix: String,
        reason: &'static str,
    },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate the full configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mount = &config.gateway.mount_prefix;
    let mount_check = check_prefix(mount).and_then(|_| {
        if mount == "/health" || mount.starts_with("/health/") {
            Err("conflicts with the gateway health endpoint")
        } else if mount.contains(['{', '}', '*', ':']) {
            Err("must not contain route syntax ('{', '}', '*', ':')")
        } else {
            Ok(())
        }
    });
    if let Err(reason) = mount_check {
        errors.push(ValidationError::InvalidMountPrefix {
            prefix: mount.clone(),
            reason,
        });
    }

    errors.extend(validate_services(&config.services));

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("health_check.timeout_secs"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the service list on its own. Used by the route table builder too.
pub fn validate_services(services: &[ServiceConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    if services.is_empty() {
        errors.push(ValidationError::NoServices);
    }

    for service in services {
        if service.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        } else if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }

        if let Err(reason) = parse_origin(&service.url) {
            errors.push(ValidationError::InvalidUrl {
                service: service.name.clone(),
                url: service.url.clone(),
                reason,
            });
        }

        if service.prefixes.is_empty() {
            errors.push(ValidationError::NoPrefixes(service.name.clone()));
        }

        for prefix in &service.prefixes {
            if let Err(reason) = check_prefix(prefix) {
                errors.push(ValidationError::InvalidPrefix {
                    service: service.name.clone(),
                    prefix: prefix.clone(),
                    reason,
                });
            }
        }
    }

    errors
}

/// A prefix is `/` followed by at least one character and no trailing `/`.
pub fn check_prefix(prefix: &str) -> Result<(), &'static str> {
    if prefix.is_empty() {
        return Err("must not be empty");
    }
    if !prefix.starts_with('/') {
        return Err("must begin with '/'");
    }
    if prefix == "/" {
        return Err("must name at least one path segment");
    }
    if prefix.ends_with('/') {
        return Err("must not end with '/'");
    }
    if prefix.contains(['?', '#']) {
        return Err("must not contain a query or fragment");
    }
    Ok(())
}

/// Parse an upstream origin. Only plain `http` with a host is forwardable.
pub fn parse_origin(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not carry a query or fragment".to_string());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.services.push(ServiceConfig::new("sales", "ftp://x", &["sales/"]));

        let errors = validate_config(&config).unwrap_err();

        assert!(errors.contains(&ValidationError::InvalidBindAddress("nowhere".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeout("request_secs")));
        assert!(errors.contains(&ValidationError::DuplicateService("sales".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidUrl { service, .. } if service == "sales")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidPrefix { prefix, .. } if prefix == "sales/")));
    }

    #[test]
    fn test_prefix_rules() {
        assert!(check_prefix("/customers").is_ok());
        assert!(check_prefix("/customers/tags").is_ok());
        assert!(check_prefix("").is_err());
        assert!(check_prefix("/").is_err());
        assert!(check_prefix("customers").is_err());
        assert!(check_prefix("/customers/").is_err());
        assert!(check_prefix("/customers?x=1").is_err());
    }

    #[test]
    fn test_origin_rules() {
        assert!(parse_origin("http://localhost:3002").is_ok());
        assert!(parse_origin("http://customer-service/base").is_ok());
        assert!(parse_origin("https://localhost:3002").is_err());
        assert!(parse_origin("localhost:3002").is_err());
        assert!(parse_origin("not a url").is_err());
    }

    #[test]
    fn test_mount_prefix_rules() {
        let mut config = GatewayConfig::default();
        config.gateway.mount_prefix = "/health".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::InvalidMountPrefix { .. }
        ));

        config.gateway.mount_prefix = "api".into();
        assert!(validate_config(&config).is_err());

        for mount in ["/a{b", "/{api}", "/api/{*rest}", "/:api"] {
            config.gateway.mount_prefix = mount.into();
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::InvalidMountPrefix {
                    prefix: mount.into(),
                    reason: "must not contain route syntax ('{', '}', '*', ':')",
                }]),
                "mount {mount}"
            );
        }

        config.gateway.mount_prefix = "/gateway/v1".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_services() {
        let errors = validate_services(&[]);
        assert_eq!(errors, vec![ValidationError::NoServices]);
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("bad".into())])
        );
    }
}
