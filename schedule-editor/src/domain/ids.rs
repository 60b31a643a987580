//! String identifier types for network and schedule entities.

use std::fmt;

/// Error returned when constructing an identifier from an invalid string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {reason}")]
pub struct InvalidId {
    pub(crate) kind: &'static str,
    pub(crate) reason: &'static str,
}

/// Error returned when inserting an entity whose id is already taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate {kind} id: {id}")]
pub struct DuplicateId {
    pub kind: &'static str,
    pub id: String,
}

/// Defines an opaque, non-empty string identifier and generates:
/// - `new(String)` / `parse(&str)` constructors that reject empty input
/// - `as_str`, `into_inner`
/// - `Display` as the raw value, `Debug` as `Name(value)`
/// - serde as a plain string (validated on deserialize)
///
/// Usage:
///   string_id!(LinkId, "link");
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, rejecting empty strings.
            pub fn new(s: String) -> Result<Self, InvalidId> {
                if s.is_empty() {
                    return Err(InvalidId {
                        kind: $kind,
                        reason: "must not be empty",
                    });
                }
                Ok($name(s))
            }

            /// Create an identifier from a string slice.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                Self::new(s.to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identifier of a network node.
    NodeId,
    "node"
);

string_id!(
    /// Identifier of a directed network link.
    LinkId,
    "link"
);

string_id!(
    /// Identifier of a transit line.
    LineId,
    "line"
);

string_id!(
    /// Identifier of a transit route, unique within its line.
    RouteId,
    "route"
);

string_id!(
    /// A transport mode such as `bus` or `rail`.
    ///
    /// Used both for the declared mode of a transit route and for the modes
    /// a network link allows.
    TransportMode,
    "transport mode"
);
