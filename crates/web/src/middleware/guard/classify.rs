//! Path classification for the route guard.
//!
//! Pure functions over the request path and query: no cookies, no I/O.

use crate::config::LocaleConfig;
use crate::models::AdminSection;

/// Which protection a page path needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Login and registration; signed-in users are sent to their account.
    Public,
    /// `/me` and below; needs a session cookie.
    Private,
    /// `/admin` and below; needs an ADMIN or STAFF principal.
    Admin,
    /// Everything else.
    Other,
}

/// What the guard should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Not a page request; pass through untouched.
    Skip,
    /// Redirect before any authentication check.
    Redirect(String),
    /// A locale-prefixed page.
    Page { locale: String, area: Area },
}

/// Classify a request path.
#[must_use]
pub fn classify(path: &str, query: Option<&str>, locales: &LocaleConfig) -> Decision {
    if is_skipped(path) {
        return Decision::Skip;
    }

    let trimmed = path.trim_start_matches('/');
    let (first, rest) = split_segment(trimmed);

    if !locales.is_supported(first) {
        let target = match rewrite_legacy(trimmed) {
            Some(rewritten) => format!("/{}{rewritten}", locales.default),
            None if trimmed.is_empty() => format!("/{}", locales.default),
            None => format!("/{}/{trimmed}", locales.default),
        };
        return Decision::Redirect(with_query(target, query));
    }

    let locale = first.to_string();
    let after_locale = rest.trim_start_matches('/');
    if let Some(rewritten) = rewrite_legacy(after_locale) {
        return Decision::Redirect(with_query(format!("/{locale}{rewritten}"), query));
    }

    let area = match split_segment(after_locale).0 {
        "admin" => Area::Admin,
        "me" => Area::Private,
        "login" | "register" => Area::Public,
        _ => Area::Other,
    };

    Decision::Page { locale, area }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// API calls, health checks, framework assets and file requests.
fn is_skipped(path: &str) -> bool {
    const PREFIXES: &[&str] = &["/api/", "/_next/", "/static/"];

    path == "/api"
        || path.starts_with("/health")
        || PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || path.rsplit('/').next().is_some_and(|last| last.contains('.'))
}

/// Split off the first path segment: `"a/b/c"` gives `("a", "/b/c")`.
fn split_segment(path: &str) -> (&str, &str) {
    path.find('/')
        .map_or((path, ""), |index| path.split_at(index))
}

/// `dashboard/x` becomes `/admin/dashboard/x`.
fn rewrite_legacy(path: &str) -> Option<String> {
    let (first, rest) = split_segment(path);
    AdminSection::from_legacy_segment(first)
        .map(|section| format!("/admin/{}{rest}", section.slug()))
}

fn with_query(mut target: String, query: Option<&str>) -> String {
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locales() -> LocaleConfig {
        LocaleConfig {
            default: "en".to_string(),
            supported: vec!["en".to_string(), "vi".to_string()],
        }
    }

    fn page(locale: &str, area: Area) -> Decision {
        Decision::Page {
            locale: locale.to_string(),
            area,
        }
    }

    #[test]
    fn test_skipped_paths() {
        for path in [
            "/api/orders",
            "/api",
            "/health",
            "/health/ready",
            "/_next/static/chunk.js",
            "/static/logo",
            "/favicon.ico",
            "/en/assets/app.3f2a.js",
        ] {
            assert_eq!(classify(path, None, &locales()), Decision::Skip, "{path}");
        }
    }

    #[test]
    fn test_missing_locale_redirects_with_query() {
        assert_eq!(
            classify("/", None, &locales()),
            Decision::Redirect("/en".to_string())
        );
        assert_eq!(
            classify("/products/42", Some("ref=mail"), &locales()),
            Decision::Redirect("/en/products/42?ref=mail".to_string())
        );
        assert_eq!(
            classify("/fr/cart", None, &locales()),
            Decision::Redirect("/en/fr/cart".to_string())
        );
    }

    #[test]
    fn test_legacy_admin_paths_are_rewritten() {
        assert_eq!(
            classify("/en/dashboard", None, &locales()),
            Decision::Redirect("/en/admin/dashboard".to_string())
        );
        assert_eq!(
            classify("/vi/admin-products/7/edit", Some("tab=stock"), &locales()),
            Decision::Redirect("/vi/admin/products/7/edit?tab=stock".to_string())
        );
        assert_eq!(
            classify("/orders", None, &locales()),
            Decision::Redirect("/en/admin/orders".to_string())
        );
    }

    #[test]
    fn test_areas() {
        assert_eq!(classify("/en/admin", None, &locales()), page("en", Area::Admin));
        assert_eq!(
            classify("/vi/admin/orders/3", None, &locales()),
            page("vi", Area::Admin)
        );
        assert_eq!(classify("/en/me", None, &locales()), page("en", Area::Private));
        assert_eq!(
            classify("/en/me/orders", None, &locales()),
            page("en", Area::Private)
        );
        assert_eq!(classify("/en/login", None, &locales()), page("en", Area::Public));
        assert_eq!(
            classify("/en/register", None, &locales()),
            page("en", Area::Public)
        );
        assert_eq!(classify("/en", None, &locales()), page("en", Area::Other));
        assert_eq!(
            classify("/en/products", None, &locales()),
            page("en", Area::Other)
        );
        assert_eq!(
            classify("/en/menu", None, &locales()),
            page("en", Area::Other)
        );
    }
}
