//! Identifiers for builds, builders, revisions and pushes.
//!
//! Every value with an identity in the reporting domain is a distinct newtype
//! wrapping a primitive, so a [`BuilderName`] cannot be passed where a
//! [`Revision`] is expected even though both are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// string_id!: non-empty String newtype with new() -> Option, as_str(), Display.
// Deserialisation goes through new(), so empty JSON strings are rejected too.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wraps `value`. Empty strings are not valid identifiers.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                (!value.is_empty()).then_some(Self(value))
            }

            /// Borrowed string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
                    .ok_or_else(|| concat!(stringify!($name), " must not be empty").to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// u64_id!: Copy integer newtype with new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw pipeline integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Raw integer form.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: pipeline-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies one build across the whole pipeline.
    ///
    /// This is the id carried in lifecycle notification keys, not the
    /// per-builder [`BuildNumber`].
    BuildId
}

u64_id! {
    /// Sequential number of a build within its builder (starts at `0`).
    BuildNumber
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single per-reference status push.
///
/// Generated fresh for every push and attached to its tracing span so the
/// token request and the status submission of one reference can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushId(Uuid);

impl PushId {
    /// Generates a new random push identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

}

impl std::fmt::Display for PushId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (configuration / Git names)
// ---------------------------------------------------------------------------

string_id! {
    /// Name of the builder that ran a build (e.g. `"Builder0"`).
    ///
    /// Used as the default commit-status `key` and display `name`.
    BuilderName
}

string_id! {
    /// A Git revision identifier, normally a full commit hash.
    Revision
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_are_rejected() {
        assert!(BuilderName::new("").is_none());
        assert!(Revision::new(String::new()).is_none());
    }

    #[test]
    fn empty_strings_are_rejected_when_deserialising() {
        let err = serde_json::from_str::<BuilderName>("\"\"").unwrap_err();
        assert!(err.to_string().contains("BuilderName must not be empty"));
        assert!(serde_json::from_str::<Revision>("\"\"").is_err());
    }

    #[test]
    fn string_ids_serialise_as_plain_strings() {
        let builder: BuilderName = serde_json::from_str("\"Builder0\"").unwrap();
        assert_eq!(builder.as_str(), "Builder0");
        assert_eq!(serde_json::to_string(&builder).unwrap(), "\"Builder0\"");
    }

    #[test]
    fn string_ids_display_their_value() {
        let rev = Revision::new("d34db33fd43db33f").unwrap();
        assert_eq!(rev.to_string(), "d34db33fd43db33f");
        assert_eq!(rev.as_str(), "d34db33fd43db33f");
    }

    #[test]
    fn push_ids_are_unique() {
        assert_ne!(PushId::new_random(), PushId::new_random());
    }
}
