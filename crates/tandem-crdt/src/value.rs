//! Value slots that may hold either plain data or another CRDT.
//!
//! Embedded structures are stored as handles, so mutating an embedded set
//! after it was inserted is visible through every outer structure that holds
//! it. Equality of an embedded value is the identity of the structure; plain
//! values compare by content.

use crate::map::LwwMap;
use crate::register::LwwRegister;
use crate::set::LwwElementSet;
use std::fmt;

/// A value stored in a register, set element, or map entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Plain text.
    Plain(String),
    /// An embedded register.
    Register(LwwRegister<Value>),
    /// An embedded element set.
    Set(LwwElementSet<Value>),
    /// An embedded map.
    Map(LwwMap<String, Value>),
}

impl Value {
    /// Returns the text of a plain value.
    #[must_use]
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Self::Plain(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_register(&self) -> Option<&LwwRegister<Value>> {
        match self {
            Self::Register(register) => Some(register),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&LwwElementSet<Value>> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&LwwMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns `true` for the embedded variants.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Plain(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Plain(text.to_owned())
    }
}

impl From<LwwRegister<Value>> for Value {
    fn from(register: LwwRegister<Value>) -> Self {
        Self::Register(register)
    }
}

impl From<LwwElementSet<Value>> for Value {
    fn from(set: LwwElementSet<Value>) -> Self {
        Self::Set(set)
    }
}

impl From<LwwMap<String, Value>> for Value {
    fn from(map: LwwMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// Renders the current view: set members and map keys are sorted so two
/// converged replicas print identically.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(text) => f.write_str(text),
            Self::Register(register) => match register.get() {
                Some(value) => write!(f, "({value})"),
                None => f.write_str("()"),
            },
            Self::Set(set) => {
                let mut members: Vec<String> = set.iter().map(|v| v.to_string()).collect();
                members.sort();
                write!(f, "{{{}}}", members.join(", "))
            }
            Self::Map(map) => {
                let mut entries: Vec<(String, Value)> = map.entries().iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}
