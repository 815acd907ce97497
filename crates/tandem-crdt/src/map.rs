//! Last-Writer-Wins map.
//!
//! Key presence is an LWW element set; next to it the map keeps, per key, the
//! most recently accepted `(value, timestamp)` record. Removing a key only adds
//! a remove-entry for it, so the record survives and a later add can bring the
//! key back with a new value.

use crate::clock::Timestamp;
use crate::set::Tracks;
use crate::traits::Crdt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Record<V> {
    value: V,
    timestamp: Timestamp,
}

#[derive(Debug, Clone)]
struct MapState<K, V> {
    keys: Tracks<K>,
    records: HashMap<K, Record<V>>,
}

impl<K, V> Default for MapState<K, V> {
    fn default() -> Self {
        Self {
            keys: Tracks::default(),
            records: HashMap::new(),
        }
    }
}

/// A Last-Writer-Wins key-value map.
///
/// A shared handle with identity equality, like the other structures in this
/// crate. [`keys`](Self::keys) and [`entries`](Self::entries) return live
/// views that recompute the present keys every time they are iterated.
///
/// # Example
///
/// ```rust
/// use tandem_crdt::LwwMap;
///
/// let map = LwwMap::new();
/// map.add("name", "Ada", 10);
/// map.add("name", "Grace", 20);
/// assert_eq!(map.get(&"name"), Some("Grace"));
/// assert_eq!(map.len(), 1);
///
/// map.remove("name", 30);
/// assert!(!map.contains_key(&"name"));
/// ```
pub struct LwwMap<K, V> {
    inner: Arc<Mutex<MapState<K, V>>>,
}

impl<K, V> LwwMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MapState::default())),
        }
    }

    /// Returns `true` if both handles point at the same map.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> LwwMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Records `value` for `key` at `timestamp`.
    ///
    /// Rejected (returns `false`, nothing changes) when an add of `key` with a
    /// strictly newer timestamp is already recorded, or when the key's current
    /// value record is strictly newer. Otherwise the value becomes visible at
    /// once, replacing any older value for the key.
    pub fn add(&self, key: K, value: V, timestamp: Timestamp) -> bool {
        let mut state = self.inner.lock();
        if !state.keys.admits_add(&key, timestamp) {
            return false;
        }
        if state
            .records
            .get(&key)
            .is_some_and(|record| record.timestamp > timestamp)
        {
            return false;
        }
        state.keys.add(key.clone(), timestamp);
        state.records.insert(key, Record { value, timestamp });
        true
    }

    /// Records a remove of `key` at `timestamp`.
    ///
    /// Returns `false` if a remove of `key` with a strictly newer timestamp is
    /// already recorded.
    pub fn remove(&self, key: K, timestamp: Timestamp) -> bool {
        self.inner.lock().keys.remove(key, timestamp)
    }

    /// Returns `true` if `key` is currently present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().keys.contains(key)
    }

    /// The value of `key`, or `None` if the key is not present.
    pub fn get(&self, key: &K) -> Option<V> {
        let state = self.inner.lock();
        if !state.keys.contains(key) {
            return None;
        }
        state.records.get(key).map(|record| record.value.clone())
    }

    /// The last value recorded for `key`, even if the key has since been removed.
    pub fn last_value(&self, key: &K) -> Option<V> {
        self.inner
            .lock()
            .records
            .get(key)
            .map(|record| record.value.clone())
    }

    /// The timestamp of the visible value of `key`.
    pub fn timestamp_of(&self, key: &K) -> Option<Timestamp> {
        let state = self.inner.lock();
        state.keys.effective(key)?;
        state.records.get(key).map(|record| record.timestamp)
    }

    /// Number of present keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    /// Returns `true` if no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every present key at `timestamp`. No-op on an empty map.
    pub fn clear(&self, timestamp: Timestamp) {
        self.inner.lock().keys.clear(timestamp);
    }

    /// A live view over the present keys.
    #[must_use]
    pub fn keys(&self) -> Keys<K, V> {
        Keys { map: self.clone() }
    }

    /// A live view over the present `(key, value)` pairs.
    #[must_use]
    pub fn entries(&self) -> Entries<K, V> {
        Entries { map: self.clone() }
    }

    fn present_keys(&self) -> Vec<K> {
        self.inner.lock().keys.present_values()
    }

    fn present_entries(&self) -> Vec<(K, V)> {
        let state = self.inner.lock();
        state
            .keys
            .present()
            .into_iter()
            .filter_map(|(key, _)| {
                state
                    .records
                    .get(key)
                    .map(|record| (key.clone(), record.value.clone()))
            })
            .collect()
    }

    /// Lengths of the key add-track and remove-track.
    #[must_use]
    pub fn track_len(&self) -> (usize, usize) {
        self.inner.lock().keys.track_len()
    }
}

impl<K, V> Crdt for LwwMap<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Unions the key tracks; per key the strictly newer value record wins and
    /// on a tie the receiving side keeps its own.
    fn merge(&self, other: &Self) {
        if self.same_as(other) {
            return;
        }
        let theirs = other.inner.lock().clone();
        let mut state = self.inner.lock();
        state.keys.absorb(&theirs.keys);
        for (key, record) in theirs.records {
            let newer = state
                .records
                .get(&key)
                .map_or(true, |current| current.timestamp < record.timestamp);
            if newer {
                state.records.insert(key, record);
            }
        }
    }

    fn dominates(&self, other: &Self) -> bool {
        if self.same_as(other) {
            return true;
        }
        let theirs = other.inner.lock().clone();
        let state = self.inner.lock();
        state.keys.covers(&theirs.keys)
            && theirs.records.iter().all(|(key, record)| {
                state
                    .records
                    .get(key)
                    .is_some_and(|current| current.timestamp >= record.timestamp)
            })
    }
}

impl<K, V> Clone for LwwMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for LwwMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PartialEq for LwwMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<K, V> Eq for LwwMap<K, V> {}

impl<K, V> Hash for LwwMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl<K, V> fmt::Debug for LwwMap<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.present_entries();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// Live view over a map's present keys.
#[derive(Clone)]
pub struct Keys<K, V> {
    map: LwwMap<K, V>,
}

impl<K, V> Keys<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Iterates over the keys present at the moment of the call.
    pub fn iter(&self) -> std::vec::IntoIter<K> {
        self.map.present_keys().into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Keys<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    type Item = K;
    type IntoIter = std::vec::IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Live view over a map's present `(key, value)` pairs.
#[derive(Clone)]
pub struct Entries<K, V> {
    map: LwwMap<K, V>,
}

impl<K, V> Entries<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Iterates over the entries present at the moment of the call.
    pub fn iter(&self) -> std::vec::IntoIter<(K, V)> {
        self.map.present_entries().into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a Entries<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
