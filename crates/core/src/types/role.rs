//! Principal roles as issued by the backend.

use serde::{Deserialize, Deserializer, Serialize};

/// Role attached to an authenticated principal.
///
/// Decoding is case-insensitive. Roles the gateway does not know about decode
/// to [`Role::Unknown`] and never reach the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to the admin console.
    Admin,
    /// Store staff; admin console access.
    Staff,
    /// Storefront customer.
    Customer,
    /// Any role string this build does not recognize.
    Unknown,
}

impl Role {
    /// Whether this role may open `/admin/*` pages and admin streams.
    #[must_use]
    pub const fn can_access_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Staff => write!(f, "STAFF"),
            Self::Customer => write!(f, "CUSTOMER"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "STAFF" => Ok(Self::Staff),
            "CUSTOMER" => Ok(Self::Customer),
            "" => Err("role cannot be empty".to_string()),
            _ => Ok(Self::Unknown),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
