//! Replica identity.

use crate::error::{ProtocolError, Result};
use std::fmt;
use std::str::FromStr;

/// The identity a replica stamps on every envelope it sends.
///
/// An id is a non-empty run of characters with no whitespace and no square
/// brackets, so it can be rendered inside `[...]` and read back unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Creates a replica id, validating its characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::InvalidReplicaId {
                id,
                reason: "empty",
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidReplicaId {
                id,
                reason: "contains whitespace",
            });
        }
        if id.contains(['[', ']']) {
            return Err(ProtocolError::InvalidReplicaId {
                id,
                reason: "contains a square bracket",
            });
        }
        Ok(Self(id))
    }

    /// Creates a random id (a v4 UUID).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReplicaId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReplicaId {
    type Error = ProtocolError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<ReplicaId> for String {
    fn from(id: ReplicaId) -> Self {
        id.0
    }
}

impl AsRef<str> for ReplicaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        let id = ReplicaId::new("alice").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
        assert_eq!("bob-2".parse::<ReplicaId>().unwrap().as_str(), "bob-2");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(ReplicaId::new("").is_err());
        assert!(ReplicaId::new("two words").is_err());
        assert!(ReplicaId::new("tab\there").is_err());
        assert!(ReplicaId::new("[x]").is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct_and_valid() {
        let a = ReplicaId::generate();
        let b = ReplicaId::generate();
        assert_ne!(a, b);
        assert!(ReplicaId::new(a.as_str()).is_ok());
    }
}
