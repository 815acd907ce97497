//! Last-Writer-Wins (LWW) Register CRDT.

use crate::clock::Timestamp;
use crate::traits::Crdt;
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Cell<V> {
    value: V,
    timestamp: Timestamp,
}

/// A Last-Writer-Wins register holding at most one value.
///
/// An update is accepted unless its timestamp is strictly older than the one
/// stored; an equal timestamp overwrites. Like every structure in this crate
/// the register is a shared handle: clones observe the same cell, and
/// equality is by identity.
///
/// # Example
///
/// ```rust
/// use tandem_crdt::LwwRegister;
///
/// let reg = LwwRegister::new();
/// assert_eq!(reg.get(), None);
///
/// reg.update("x", 10);
/// reg.update("y", 5); // older, ignored
/// assert_eq!(reg.get(), Some("x"));
/// ```
pub struct LwwRegister<V> {
    inner: Arc<Mutex<Option<Cell<V>>>>,
}

impl<V> LwwRegister<V> {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a register already holding `value` at `timestamp`.
    #[must_use]
    pub fn with_value(value: V, timestamp: Timestamp) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Cell { value, timestamp }))),
        }
    }

    /// Returns `true` if both handles point at the same register.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Sets `value` unless `timestamp` is older than the stored one.
    ///
    /// Returns `true` if the value was written.
    pub fn update(&self, value: V, timestamp: Timestamp) -> bool {
        let mut cell = self.inner.lock();
        if cell.as_ref().is_some_and(|current| timestamp < current.timestamp) {
            return false;
        }
        *cell = Some(Cell { value, timestamp });
        true
    }

    /// The timestamp of the held value, or `None` if never written.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.inner.lock().as_ref().map(|cell| cell.timestamp)
    }

    /// Returns `true` if the register has never been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl<V: Clone> LwwRegister<V> {
    /// Returns the held value, or `None` if never written.
    #[must_use]
    pub fn get(&self) -> Option<V> {
        self.inner.lock().as_ref().map(|cell| cell.value.clone())
    }
}

impl<V: Clone> Crdt for LwwRegister<V> {
    /// The strictly newer cell wins; on a tie the receiving side keeps its value.
    fn merge(&self, other: &Self) {
        if self.same_as(other) {
            return;
        }
        let theirs = other.inner.lock().clone();
        let Some(theirs) = theirs else {
            return;
        };
        let mut cell = self.inner.lock();
        let newer = cell
            .as_ref()
            .map_or(true, |current| current.timestamp < theirs.timestamp);
        if newer {
            *cell = Some(theirs);
        }
    }

    fn dominates(&self, other: &Self) -> bool {
        if self.same_as(other) {
            return true;
        }
        match (self.timestamp(), other.timestamp()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(ours), Some(theirs)) => ours >= theirs,
        }
    }
}

impl<V> Clone for LwwRegister<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for LwwRegister<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PartialEq for LwwRegister<V> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<V> Eq for LwwRegister<V> {}

impl<V> Hash for LwwRegister<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl<V: Clone + fmt::Debug> fmt::Debug for LwwRegister<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.get();
        f.debug_tuple("LwwRegister").field(&value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let reg: LwwRegister<String> = LwwRegister::new();
        assert!(reg.is_empty());
        assert_eq!(reg.get(), None);
        assert_eq!(reg.timestamp(), None);
    }

    #[test]
    fn test_first_write_always_accepted() {
        let reg = LwwRegister::new();
        assert!(reg.update("first", -5));
        assert_eq!(reg.get(), Some("first"));
    }

    #[test]
    fn test_update_with_higher_timestamp() {
        let reg = LwwRegister::with_value("old", 5);
        assert!(reg.update("new", 10));
        assert_eq!(reg.get(), Some("new"));
        assert_eq!(reg.timestamp(), Some(10));
    }

    #[test]
    fn test_update_with_lower_timestamp_ignored() {
        let reg = LwwRegister::new();
        reg.update("x", 10);
        assert!(!reg.update("y", 5));
        assert_eq!(reg.get(), Some("x"));
        assert_eq!(reg.timestamp(), Some(10));
    }

    #[test]
    fn test_update_with_equal_timestamp_overwrites() {
        let reg = LwwRegister::with_value("current", 10);
        assert!(reg.update("concurrent", 10));
        assert_eq!(reg.get(), Some("concurrent"));
    }

    #[test]
    fn test_merge_higher_timestamp_wins() {
        let a = LwwRegister::with_value("a", 5);
        let b = LwwRegister::with_value("b", 10);
        a.merge(&b);
        assert_eq!(a.get(), Some("b"));
        assert!(a.dominates(&b));
    }

    #[test]
    fn test_merge_equal_timestamp_keeps_current() {
        let a = LwwRegister::with_value("a", 10);
        let b = LwwRegister::with_value("b", 10);
        a.merge(&b);
        b.merge(&a);
        assert_eq!(a.get(), Some("a"));
        assert_eq!(b.get(), Some("b"));
        // Neither side has anything newer to offer the other.
        assert!(a.dominates(&b) && b.dominates(&a));
    }

    #[test]
    fn test_merge_into_empty() {
        let a = LwwRegister::new();
        let b = LwwRegister::with_value("b", 1);
        assert!(!a.dominates(&b));
        a.merge(&b);
        assert_eq!(a.get(), Some("b"));
    }

    #[test]
    fn test_clone_shares_cell() {
        let reg = LwwRegister::new();
        let alias = reg.clone();
        alias.update(7, 1);
        assert_eq!(reg.get(), Some(7));
        assert_eq!(reg, alias);
        assert_ne!(reg, LwwRegister::with_value(7, 1));
    }
}
