//! Path matching primitives.
//!
//! # Design Decisions
//! - Prefix matching respects segment boundaries: `/customers` matches
//!   `/customers` and `/customers/42`, never `/customersX`
//! - Case-sensitive
//! - No regex; a prefix check plus one byte lookahead

/// True if `path` equals `prefix` or continues it with `/`.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Remove the mount prefix from `path` when it is present on a segment
/// boundary. The result always starts with `/`.
pub fn strip_mount<'a>(mount: &str, path: &'a str) -> &'a str {
    match path.strip_prefix(mount) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Rewrite a path-and-query for the upstream by stripping the mount prefix
/// from the path component only.
pub fn rewrite_path_and_query(mount: &str, path: &str, query: Option<&str>) -> String {
    let stripped = strip_mount(mount, path);
    match query {
        Some(q) => format!("{}?{}", stripped, q),
        None => stripped.to_string(),
    }
}
