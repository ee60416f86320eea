//! Static service route table.
//!
//! # Responsibilities
//! - Hold every upstream service with its origin and owned prefixes
//! - Preserve declaration order (it is the match order)
//! - Look up a service by name
//!
//! # Design Decisions
//! - Built once from validated configuration, never mutated afterwards
//! - Shared via `Arc` without locking
//! - Construction re-validates the service list so a table can never hold
//!   an unusable origin or prefix

use std::collections::HashMap;

use axum::http::uri::{InvalidUri, Uri};
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::ServiceConfig;
use crate::config::validation::{parse_origin, validate_services, ValidationError};
use crate::routing::matcher::prefix_matches;

/// One upstream service and the URL space it owns.
#[derive(Debug, Clone)]
pub struct ServiceRoute {
    name: String,
    base_url: Url,
    prefixes: Vec<String>,
}

impl ServiceRoute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns the first owned prefix matching `path` on a segment boundary.
    pub fn owning_prefix(&self, path: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .map(String::as_str)
            .find(|prefix| prefix_matches(prefix, path))
    }

    /// Build the absolute upstream URI for an already rewritten path.
    ///
    /// Any path carried by the base URL is kept in front of `path_and_query`.
    pub fn upstream_uri(&self, path_and_query: &str) -> Result<Uri, InvalidUri> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{}{}", base, path_and_query).parse()
    }
}

/// Immutable, ordered mapping from service name to route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<ServiceRoute>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    /// Build the table from service configuration.
    pub fn from_services(services: &[ServiceConfig]) -> Result<Self, ConfigError> {
        let errors = validate_services(services);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let mut routes = Vec::with_capacity(services.len());
        let mut by_name = HashMap::with_capacity(services.len());

        for service in services {
            let base_url = parse_origin(&service.url).map_err(|reason| {
                ConfigError::Validation(vec![ValidationError::InvalidUrl {
                    service: service.name.clone(),
                    url: service.url.clone(),
                    reason,
                }])
            })?;

            by_name.insert(service.name.clone(), routes.len());
            routes.push(ServiceRoute {
                name: service.name.clone(),
                base_url,
                prefixes: service.prefixes.clone(),
            });
        }

        Ok(Self { routes, by_name })
    }

    pub fn lookup(&self, service_name: &str) -> Option<&ServiceRoute> {
        self.by_name.get(service_name).map(|&i| &self.routes[i])
    }

    /// All routes in match order.
    pub fn all(&self) -> impl Iterator<Item = (&str, &ServiceRoute)> {
        self.routes.iter().map(|r| (r.name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
