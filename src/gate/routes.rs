//! Path classification for the route gate.
//!
//! Two questions are answered here, both as pure functions of the request path:
//! whether the gate runs at all ([`is_gated`]), and whether a gated path is public
//! ([`is_public`]).

/// Default public allow-list.
///
/// `/setup-admin` bootstraps the first admin account without authentication. It is
/// flagged for product-owner review; operators can drop it through `PUBLIC_ROUTES`.
pub const DEFAULT_PUBLIC_ROUTES: [&str; 3] = ["/login", "/setup-admin", "/register"];

/// Asset prefixes the gate never runs on.
///
/// Image files are only served from under these prefixes. A file extension alone
/// never skips the gate, since dynamic page routes such as `/orders/{id}` would
/// otherwise answer `/orders/42.png` unauthenticated.
const EXCLUDED_PREFIXES: [&str; 4] = ["/_next/static", "/_next/image", "/static", "/favicon.ico"];

/// Whether `path` is covered by the public allow-list.
///
/// A route matches the path itself and anything below it on a segment boundary, so
/// `/login`, `/login/` and `/login/reset` are public while `/loginx` is not. Query
/// strings and fragments are ignored. Paths containing `.` or `..` segments, raw or
/// percent-encoded, are never public.
///
/// ```rust
/// use storefront_admin::gate::routes::is_public;
///
/// let public = ["/login".to_string()];
/// assert!(is_public("/login?redirect=%2Forders", &public));
/// assert!(!is_public("/login/../orders", &public));
/// ```
pub fn is_public(path: &str, public_routes: &[String]) -> bool {
    let path = strip_query(path);
    if has_dot_segment(path) {
        return false;
    }
    public_routes
        .iter()
        .any(|route| matches_route(path, route))
}

/// Whether the gate runs for `path` at all.
///
/// Static assets, optimized images and the favicon skip the gate. Paths with dot
/// segments always run it.
pub fn is_gated(path: &str) -> bool {
    let path = strip_query(path);
    has_dot_segment(path)
        || !EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| matches_route(path, prefix))
}

/// Normalizes an allow-list entry: leading slash, no trailing slash.
/// Returns `None` for entries that would match every path.
pub fn normalize_route(route: &str) -> Option<String> {
    let trimmed = route.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or_default()
}

/// Anchored prefix match on a segment boundary.
fn matches_route(path: &str, route: &str) -> bool {
    let route = route.trim_end_matches('/');
    if route.is_empty() {
        return false;
    }
    path.strip_prefix(route)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}
