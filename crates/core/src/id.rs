//! Strongly-typed identifiers used across the reservation domain.
//!
//! Supplier and product ids are the integer keys owned by the catalog
//! collaborator; session ids are opaque client-chosen strings.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Identifier of a supplier holding stock for a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(i64);

/// Identifier of a product in the stock ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = i64::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(SupplierId, "SupplierId");
impl_int_newtype!(ProductId, "ProductId");

/// Client session identifier (first component of a reservation's composite key).
///
/// Must be non-blank. A session id that ends in `_<int>_<int>` can make its
/// keys match another pair's suffix scan; callers are expected to avoid that
/// shape (UUIDs in simple format are a safe choice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::validation("session id cannot be empty"));
        }
        // Must be representable in a `Location` header.
        if value.chars().any(char::is_control) {
            return Err(DomainError::validation("session id cannot contain control characters"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl FromStr for SessionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ids_parse_and_display() {
        let id: SupplierId = " 42 ".parse().unwrap();
        assert_eq!(id, SupplierId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(ProductId::from(7)), 7);
    }

    #[test]
    fn integer_id_parse_failure_is_invalid_id() {
        let err = "abc".parse::<ProductId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("ProductId")));
    }

    #[test]
    fn blank_session_id_is_rejected() {
        assert_eq!(
            SessionId::new("   "),
            Err(DomainError::validation("session id cannot be empty"))
        );
        assert!(SessionId::new("abc").is_ok());
    }

    #[test]
    fn control_characters_in_session_id_are_rejected() {
        for raw in ["bad\u{7}sess", "line\nbreak", "tab\there", "del\u{7f}"] {
            assert_eq!(
                SessionId::new(raw),
                Err(DomainError::validation("session id cannot contain control characters")),
                "{raw:?}"
            );
        }
        assert!(SessionId::new("caf\u{e9} 1").is_ok());
    }

    #[test]
    fn session_id_deserialization_validates() {
        let ok: SessionId = serde_json::from_str("\"s1\"").unwrap();
        assert_eq!(ok.as_str(), "s1");
        assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
    }
}
