//! Admin console sections.
//!
//! One table drives both the admin navigation menu and the rewrite of the
//! pre-`/admin` URLs that bookmarks and old emails still point at.

use serde::Serialize;

/// A top-level page of the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminSection {
    Dashboard,
    Orders,
    Products,
    Accounts,
    Analytics,
    Settings,
}

impl AdminSection {
    /// Sections in menu order.
    pub const ALL: [Self; 6] = [
        Self::Dashboard,
        Self::Orders,
        Self::Products,
        Self::Accounts,
        Self::Analytics,
        Self::Settings,
    ];

    /// Path segment under `/admin/`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Orders => "orders",
            Self::Products => "products",
            Self::Accounts => "accounts",
            Self::Analytics => "analytics",
            Self::Settings => "settings",
        }
    }

    /// Top-level segment the section lived at before the `/admin` prefix.
    #[must_use]
    pub const fn legacy_segment(self) -> &'static str {
        match self {
            Self::Products => "admin-products",
            other => other.slug(),
        }
    }

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Orders => "Orders",
            Self::Products => "Products",
            Self::Accounts => "Accounts",
            Self::Analytics => "Analytics",
            Self::Settings => "Settings",
        }
    }

    /// Look up a section by its legacy top-level segment.
    #[must_use]
    pub fn from_legacy_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.legacy_segment() == segment)
    }

    /// Locale-prefixed page path.
    #[must_use]
    pub fn href(self, locale: &str) -> String {
        format!("/{locale}/admin/{}", self.slug())
    }
}

/// One entry of the admin navigation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub key: &'static str,
    pub label: &'static str,
    pub href: String,
}

impl NavItem {
    /// The full menu for `locale`.
    #[must_use]
    pub fn menu(locale: &str) -> Vec<Self> {
        AdminSection::ALL
            .into_iter()
            .map(|section| Self {
                key: section.slug(),
                label: section.label(),
                href: section.href(locale),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_segments() {
        assert_eq!(
            AdminSection::from_legacy_segment("admin-products"),
            Some(AdminSection::Products)
        );
        assert_eq!(
            AdminSection::from_legacy_segment("dashboard"),
            Some(AdminSection::Dashboard)
        );
        assert_eq!(AdminSection::from_legacy_segment("products"), None);
        assert_eq!(AdminSection::from_legacy_segment("cart"), None);
    }

    #[test]
    fn test_menu() {
        let menu = NavItem::menu("vi");
        assert_eq!(menu.len(), 6);
        assert_eq!(menu[2].href, "/vi/admin/products");
        assert_eq!(menu[0].key, "dashboard");
    }
}
