//! Newtype IDs for backend entity references.
//!
//! The backend is free to issue numeric or string identifiers, so every ID
//! is stored as its canonical string form. Use the `define_id!` macro to
//! create wrappers that prevent mixing IDs from different entity types.

/// Macro to define a backend-issued ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string
/// - `Deserialize` from either a JSON string or a JSON number
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - `new()`, `as_str()` and `From<&str>` / `From<String>`
///
/// # Example
///
/// ```rust
/// # use emporium_core::define_id;
/// define_id!(InvoiceId);
///
/// let from_number: InvoiceId = serde_json::from_str("42").unwrap();
/// let from_string: InvoiceId = serde_json::from_str("\"42\"").unwrap();
/// assert_eq!(from_number, from_string);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from its string form.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                #[derive(::serde::Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Text(String),
                    Number(::serde_json::Number),
                }

                match <Raw as ::serde::Deserialize>::deserialize(deserializer)? {
                    Raw::Text(text) if text.is_empty() => {
                        Err(<D::Error as ::serde::de::Error>::custom("empty identifier"))
                    }
                    Raw::Text(text) => Ok(Self(text)),
                    Raw::Number(number) => Ok(Self(number.to_string())),
                }
            }
        }
    };
}

define_id!(UserId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids_are_equal() {
        let a: OrderId = serde_json::from_str("1024").unwrap();
        let b: OrderId = serde_json::from_str("\"1024\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "1024");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let id = UserId::new("usr_7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"usr_7\"");
    }
}
