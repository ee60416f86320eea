//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Normalize the inbound path by stripping the gateway mount prefix
//! - Look up the owning service for the request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan over services in table order
//! - First match wins; no longest-prefix logic, so overlapping prefixes
//!   must be declared most specific first
//! - Explicit NoMatch rather than silent default

use std::sync::Arc;

use axum::http::uri::{InvalidUri, Uri};

use crate::routing::matcher::{rewrite_path_and_query, strip_mount};
use crate::routing::table::{RouteTable, ServiceRoute};

/// Outcome of matching one request path.
#[derive(Debug, Clone, Copy)]
pub enum MatchResult<'a> {
    Matched {
        service_name: &'a str,
        route: &'a ServiceRoute,
    },
    NoMatch,
}

impl<'a> MatchResult<'a> {
    pub fn service_name(&self) -> Option<&'a str> {
        match self {
            MatchResult::Matched { service_name, .. } => Some(*service_name),
            MatchResult::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }
}

/// Where a request would be sent, without sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub service_name: &'a str,
    /// Path and query after the mount prefix is stripped.
    pub forwarded_path: String,
    pub upstream: Uri,
}

/// Matches request paths against the route table.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<RouteTable>,
    mount_prefix: String,
}

impl Router {
    pub fn new(table: Arc<RouteTable>, mount_prefix: impl Into<String>) -> Self {
        Self {
            table,
            mount_prefix: mount_prefix.into(),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn mount_prefix(&self) -> &str {
        &self.mount_prefix
    }

    /// Resolve the service owning `request_path`.
    pub fn match_path(&self, request_path: &str) -> MatchResult<'_> {
        let candidate = strip_mount(&self.mount_prefix, request_path);

        for (service_name, route) in self.table.all() {
            if let Some(prefix) = route.owning_prefix(candidate) {
                tracing::trace!(service = service_name, prefix, path = candidate, "Route matched");
                return MatchResult::Matched {
                    service_name,
                    route,
                };
            }
        }

        MatchResult::NoMatch
    }

    /// Resolve a path, optionally carrying a query string, to its upstream
    /// URI. `Ok(None)` when no service owns the path.
    pub fn resolve(&self, path_and_query: &str) -> Result<Option<Resolution<'_>>, InvalidUri> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let MatchResult::Matched {
            service_name,
            route,
        } = self.match_path(path)
        else {
            return Ok(None);
        };

        let forwarded_path = rewrite_path_and_query(&self.mount_prefix, path, query);
        let upstream = route.upstream_uri(&forwarded_path)?;
        Ok(Some(Resolution {
            service_name,
            forwarded_path,
            upstream,
        }))
    }

    /// Public paths per service in match order, mount prefix included.
    pub fn mounted_prefixes(&self) -> Vec<(&ServiceRoute, Vec<String>)> {
        self.table
            .all()
            .map(|(_, route)| {
                let paths = route
                    .prefixes()
                    .iter()
                    .map(|prefix| format!("{}{}", self.mount_prefix, prefix))
                    .collect();
                (route, paths)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{default_services, ServiceConfig};

    fn router(services: &[ServiceConfig]) -> Router {
        Router::new(Arc::new(RouteTable::from_services(services).unwrap()), "/api")
    }

    #[test]
    fn test_mounted_path_matches_owner() {
        let router = router(&[
            ServiceConfig::new("customer", "http://localhost:3002", &["/customers"]),
            ServiceConfig::new("sales", "http://localhost:3003", &["/sales"]),
        ]);

        assert_eq!(router.match_path("/api/customers/42").service_name(), Some("customer"));
        assert_eq!(router.match_path("/api/customers").service_name(), Some("customer"));
        assert_eq!(router.match_path("/api/sales").service_name(), Some("sales"));
    }

    #[test]
    fn test_character_prefix_is_not_a_match() {
        let router = router(&[ServiceConfig::new("customer", "http://localhost:3002", &["/customers"])]);
        assert!(!router.match_path("/api/customersX").is_match());
        assert!(!router.match_path("/api/customer").is_match());
    }

    #[test]
    fn test_unknown_path_is_no_match() {
        let router = router(&default_services());
        assert!(matches!(router.match_path("/api/unknown/thing"), MatchResult::NoMatch));
        assert!(matches!(router.match_path("/api"), MatchResult::NoMatch));
    }

    #[test]
    fn test_unmounted_path_still_matches() {
        let router = router(&default_services());
        assert_eq!(router.match_path("/sales/3").service_name(), Some("sales"));
        assert!(!router.match_path("/apix/sales").is_match());
    }

    #[test]
    fn test_first_service_in_table_order_wins() {
        let router = router(&[
            ServiceConfig::new("tags", "http://localhost:4000", &["/customers/tags"]),
            ServiceConfig::new("customer", "http://localhost:3002", &["/customers"]),
        ]);
        assert_eq!(router.match_path("/api/customers/tags/7").service_name(), Some("tags"));
        assert_eq!(router.match_path("/api/customers/7").service_name(), Some("customer"));

        let reversed = self::router(&[
            ServiceConfig::new("customer", "http://localhost:3002", &["/customers"]),
            ServiceConfig::new("tags", "http://localhost:4000", &["/customers/tags"]),
        ]);
        assert_eq!(reversed.match_path("/api/customers/tags/7").service_name(), Some("customer"));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let router = router(&default_services());
        for path in ["/api/users/profile", "/api/auth/login", "/api/nothing", "/api/sales/1"] {
            let first = router.match_path(path).service_name();
            for _ in 0..10 {
                assert_eq!(router.match_path(path).service_name(), first);
            }
        }
    }

    #[test]
    fn test_resolve_builds_upstream_uri() {
        let router = router(&default_services());

        let resolved = router.resolve("/api/customers/42?include=notes").unwrap().unwrap();
        assert_eq!(resolved.service_name, "customer");
        assert_eq!(resolved.forwarded_path, "/customers/42?include=notes");
        assert_eq!(
            resolved.upstream.to_string(),
            "http://localhost:3002/customers/42?include=notes"
        );

        assert_eq!(router.resolve("/api/unknown?x=1").unwrap(), None);
        assert_eq!(router.resolve("/api/customersX").unwrap(), None);
    }

    #[test]
    fn test_mounted_prefixes_in_table_order() {
        let router = router(&default_services());
        let listing = router.mounted_prefixes();

        let names: Vec<_> = listing.iter().map(|(route, _)| route.name()).collect();
        assert_eq!(names, vec!["user", "customer", "sales"]);
        assert_eq!(listing[2].1, vec!["/api/sales".to_string()]);
        assert_eq!(listing[1].1[1], "/api/customers/tags");
    }

    #[test]
    fn test_default_table_routes() {
        let router = router(&default_services());
        assert_eq!(router.match_path("/api/auth/register").service_name(), Some("user"));
        assert_eq!(router.match_path("/api/users/profile").service_name(), Some("user"));
        assert_eq!(router.match_path("/api/customers/tags").service_name(), Some("customer"));
        assert!(!router.match_path("/api/auth/logout").is_match());
    }
}
