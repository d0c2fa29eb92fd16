//! Configuration attributes, literal or deferred.
//!
//! An [`Attribute`] is a single configuration value on a resource. It is
//! either a `Literal` known at declaration time, or a `Deferred` reference
//! to an output of another resource that only becomes known once that
//! resource has been synthesized. Deferred attributes are what let a
//! service reference a database endpoint or a generated password before
//! either exists.

use serde::{Deserialize, Serialize};

/// A configuration value that may not be known until synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attribute {
    /// A value known at declaration time.
    Literal { value: serde_json::Value },
    /// A reference to the named output `field` of the resource `source`,
    /// resolvable only after `source` has been synthesized.
    Deferred { source: String, field: String },
}

impl Attribute {
    /// Create a literal attribute from any JSON-convertible value.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Create a deferred reference to an output of another resource.
    pub fn deferred(source: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Deferred {
            source: source.into(),
            field: field.into(),
        }
    }

    /// Whether this attribute is still a deferred reference.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    /// The source resource id of a deferred attribute, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Deferred { source, .. } => Some(source),
            Self::Literal { .. } => None,
        }
    }

    /// The literal value, if this attribute is not deferred.
    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Literal { value } => Some(value),
            Self::Deferred { .. } => None,
        }
    }

    /// The literal value as a port number, if it is one.
    pub fn as_u16(&self) -> Option<u16> {
        self.as_literal()
            .and_then(|v| v.as_u64())
            .and_then(|n| u16::try_from(n).ok())
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal { value } => write!(f, "{}", value),
            Self::Deferred { source, field } => write!(f, "${{{}.{}}}", source, field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_attribute() {
        let attr = Attribute::literal(5432);
        assert!(!attr.is_deferred());
        assert_eq!(attr.source(), None);
        assert_eq!(attr.as_u16(), Some(5432));
    }

    #[test]
    fn test_deferred_attribute() {
        let attr = Attribute::deferred("db", "endpoint");
        assert!(attr.is_deferred());
        assert_eq!(attr.source(), Some("db"));
        assert_eq!(attr.as_literal(), None);
        assert_eq!(attr.to_string(), "${db.endpoint}");
    }

    #[test]
    fn test_attribute_serde_round_trip() {
        let attr = Attribute::deferred("alb", "dns_name");
        let json = serde_json::to_string(&attr).unwrap();
        assert!(json.contains("deferred"));
        let back: Attribute = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attr);
    }
}
