//! Last-Writer-Wins element set.
//!
//! The set keeps two append-only tracks: every accepted add and every accepted
//! remove, each with its timestamp. Nothing is ever deleted from a track. The
//! present view is recomputed from the tracks on every read:
//!
//! ```text
//! present(v)  <=>  max_add(v) exists  and  (max_remove(v) absent  or  max_add(v) >= max_remove(v))
//! ```
//!
//! Ties favor the add.

use crate::clock::Timestamp;
use crate::traits::Crdt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One recorded add or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry<V> {
    pub(crate) value: V,
    pub(crate) timestamp: Timestamp,
}

/// The add-track and remove-track behind a set (and behind a map's keys).
#[derive(Debug, Clone)]
pub(crate) struct Tracks<V> {
    adds: Vec<Entry<V>>,
    removes: Vec<Entry<V>>,
}

impl<V> Default for Tracks<V> {
    fn default() -> Self {
        Self {
            adds: Vec::new(),
            removes: Vec::new(),
        }
    }
}

impl<V> Tracks<V>
where
    V: Clone + Eq + Hash,
{
    /// A write is stale iff some recorded entry for the same value is strictly newer.
    fn admits(track: &[Entry<V>], value: &V, timestamp: Timestamp) -> bool {
        !track
            .iter()
            .any(|entry| entry.value == *value && entry.timestamp > timestamp)
    }

    fn record(track: &mut Vec<Entry<V>>, value: V, timestamp: Timestamp) -> bool {
        if !Self::admits(track, &value, timestamp) {
            return false;
        }
        // Re-delivery of an identical entry is accepted without growing the track.
        if !track
            .iter()
            .any(|entry| entry.value == value && entry.timestamp == timestamp)
        {
            track.push(Entry { value, timestamp });
        }
        true
    }

    pub(crate) fn admits_add(&self, value: &V, timestamp: Timestamp) -> bool {
        Self::admits(&self.adds, value, timestamp)
    }

    pub(crate) fn add(&mut self, value: V, timestamp: Timestamp) -> bool {
        Self::record(&mut self.adds, value, timestamp)
    }

    pub(crate) fn remove(&mut self, value: V, timestamp: Timestamp) -> bool {
        Self::record(&mut self.removes, value, timestamp)
    }

    fn latest_in(track: &[Entry<V>], value: &V) -> Option<Timestamp> {
        track
            .iter()
            .filter(|entry| entry.value == *value)
            .map(|entry| entry.timestamp)
            .max()
    }

    /// The winning add timestamp for `value`, if the value is present.
    pub(crate) fn effective(&self, value: &V) -> Option<Timestamp> {
        let added = Self::latest_in(&self.adds, value)?;
        match Self::latest_in(&self.removes, value) {
            Some(removed) if removed > added => None,
            _ => Some(added),
        }
    }

    pub(crate) fn contains(&self, value: &V) -> bool {
        self.effective(value).is_some()
    }

    /// Present values with their winning add timestamp, oldest first.
    pub(crate) fn present(&self) -> Vec<(&V, Timestamp)> {
        if self.adds.is_empty() {
            return Vec::new();
        }

        let mut latest_add: HashMap<&V, Timestamp> = HashMap::with_capacity(self.adds.len());
        for entry in &self.adds {
            latest_add
                .entry(&entry.value)
                .and_modify(|ts| *ts = (*ts).max(entry.timestamp))
                .or_insert(entry.timestamp);
        }

        let mut latest_remove: HashMap<&V, Timestamp> = HashMap::with_capacity(self.removes.len());
        for entry in &self.removes {
            latest_remove
                .entry(&entry.value)
                .and_modify(|ts| *ts = (*ts).max(entry.timestamp))
                .or_insert(entry.timestamp);
        }

        let mut present: Vec<(&V, Timestamp)> = latest_add
            .into_iter()
            .filter(|(value, added)| latest_remove.get(value).map_or(true, |removed| added >= removed))
            .collect();
        present.sort_by_key(|(_, ts)| *ts);
        present
    }

    pub(crate) fn present_values(&self) -> Vec<V> {
        self.present()
            .into_iter()
            .map(|(value, _)| value.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.present().len()
    }

    /// Removes every present value at `timestamp`.
    pub(crate) fn clear(&mut self, timestamp: Timestamp) {
        for value in self.present_values() {
            self.remove(value, timestamp);
        }
    }

    pub(crate) fn track_len(&self) -> (usize, usize) {
        (self.adds.len(), self.removes.len())
    }

    /// Union with another replica's tracks. Bypasses the stale-write rule:
    /// a merge must keep every entry the other side accepted.
    pub(crate) fn absorb(&mut self, other: &Tracks<V>) {
        for entry in &other.adds {
            if !self.adds.contains(entry) {
                self.adds.push(entry.clone());
            }
        }
        for entry in &other.removes {
            if !self.removes.contains(entry) {
                self.removes.push(entry.clone());
            }
        }
    }

    pub(crate) fn covers(&self, other: &Tracks<V>) -> bool {
        other.adds.iter().all(|entry| self.adds.contains(entry))
            && other.removes.iter().all(|entry| self.removes.contains(entry))
    }
}

/// A Last-Writer-Wins element set.
///
/// `LwwElementSet` is a shared handle: cloning it yields another handle to the
/// *same* set, which is what lets a set be embedded in another structure and
/// still be mutated afterwards. Equality and hashing are by identity.
///
/// All operations are internally serialized and may be called from any task.
///
/// # Example
///
/// ```rust
/// use tandem_crdt::LwwElementSet;
///
/// let set = LwwElementSet::new();
/// set.add("element", 10);
/// set.remove("element", 20);
/// assert!(!set.contains(&"element"));
///
/// // A later add brings it back; a delayed older remove does not matter.
/// set.add("element", 30);
/// set.remove("element", 25);
/// assert!(set.contains(&"element"));
/// assert_eq!(set.len(), 1);
/// ```
pub struct LwwElementSet<V> {
    inner: Arc<Mutex<Tracks<V>>>,
}

impl<V> LwwElementSet<V> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tracks::default())),
        }
    }

    /// Returns `true` if both handles point at the same set.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<V> LwwElementSet<V>
where
    V: Clone + Eq + Hash,
{
    /// Records an add of `value` at `timestamp`.
    ///
    /// Returns `false` (and changes nothing) if an add of the same value with
    /// a strictly newer timestamp is already recorded.
    pub fn add(&self, value: V, timestamp: Timestamp) -> bool {
        self.inner.lock().add(value, timestamp)
    }

    /// Records a remove of `value` at `timestamp`.
    ///
    /// Returns `false` (and changes nothing) if a remove of the same value
    /// with a strictly newer timestamp is already recorded.
    pub fn remove(&self, value: V, timestamp: Timestamp) -> bool {
        self.inner.lock().remove(value, timestamp)
    }

    /// Returns `true` if `value` is currently present.
    pub fn contains(&self, value: &V) -> bool {
        self.inner.lock().contains(value)
    }

    /// The winning add timestamp of `value`, or `None` if it is not present.
    pub fn timestamp_of(&self, value: &V) -> Option<Timestamp> {
        self.inner.lock().effective(value)
    }

    /// Number of distinct present values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no value is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every present value at `timestamp`. No-op on an empty set.
    pub fn clear(&self, timestamp: Timestamp) {
        self.inner.lock().clear(timestamp);
    }

    /// Iterates over the values present right now.
    ///
    /// The present view is computed when this is called; use [`view`](Self::view)
    /// for something that can be iterated repeatedly and stays current.
    pub fn iter(&self) -> std::vec::IntoIter<V> {
        self.inner.lock().present_values().into_iter()
    }

    /// A live view: every iteration recomputes the present values.
    #[must_use]
    pub fn view(&self) -> SetView<V> {
        SetView { set: self.clone() }
    }

    /// Lengths of the add-track and remove-track, including superseded entries.
    #[must_use]
    pub fn track_len(&self) -> (usize, usize) {
        self.inner.lock().track_len()
    }
}

impl<V> Crdt for LwwElementSet<V>
where
    V: Clone + Eq + Hash,
{
    fn merge(&self, other: &Self) {
        if self.same_as(other) {
            return;
        }
        let theirs = other.inner.lock().clone();
        self.inner.lock().absorb(&theirs);
    }

    fn dominates(&self, other: &Self) -> bool {
        if self.same_as(other) {
            return true;
        }
        let theirs = other.inner.lock().clone();
        self.inner.lock().covers(&theirs)
    }
}

impl<V> Clone for LwwElementSet<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for LwwElementSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PartialEq for LwwElementSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<V> Eq for LwwElementSet<V> {}

impl<V> Hash for LwwElementSet<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl<V> fmt::Debug for LwwElementSet<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are cloned out before formatting so nested sets lock one at a time.
        let values: Vec<V> = self.iter().collect();
        f.debug_set().entries(values).finish()
    }
}

impl<'a, V> IntoIterator for &'a LwwElementSet<V>
where
    V: Clone + Eq + Hash,
{
    type Item = V;
    type IntoIter = std::vec::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A restartable, always-current sequence over a set's present values.
#[derive(Clone)]
pub struct SetView<V> {
    set: LwwElementSet<V>,
}

impl<V> SetView<V>
where
    V: Clone + Eq + Hash,
{
    /// Iterates over the values present at the moment of the call.
    pub fn iter(&self) -> std::vec::IntoIter<V> {
        self.set.iter()
    }
}

impl<V> fmt::Debug for SetView<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetView").field("set", &self.set).finish()
    }
}

impl<'a, V> IntoIterator for &'a SetView<V>
where
    V: Clone + Eq + Hash,
{
    type Item = V;
    type IntoIter = std::vec::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_set() {
        let set: LwwElementSet<&str> = LwwElementSet::new();
        assert!(!set.contains(&"element"));
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_add_makes_value_exist() {
        let set = LwwElementSet::new();
        assert!(set.add("element", 10));
        assert!(set.contains(&"element"));
    }

    #[test]
    fn test_adds_reflect_in_len() {
        let set = LwwElementSet::new();
        set.add("element1", 10);
        assert_eq!(set.len(), 1);
        set.add("element2", 11);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_adds_count_once() {
        let set = LwwElementSet::new();
        set.add("element", 10);
        set.add("element", 20);
        assert_eq!(set.len(), 1);
        assert_eq!(set.timestamp_of(&"element"), Some(20));
    }

    #[test]
    fn test_removed_value_does_not_exist() {
        let set = LwwElementSet::new();
        set.add("element", 10);
        assert!(set.remove("element", 20));
        assert!(!set.contains(&"element"));
        assert_eq!(set.timestamp_of(&"element"), None);
    }

    #[test]
    fn test_remove_without_add_is_absent() {
        let set = LwwElementSet::new();
        assert!(set.remove("ghost", 10));
        assert!(!set.contains(&"ghost"));
        // A later add still wins over the earlier tombstone.
        set.add("ghost", 15);
        assert!(set.contains(&"ghost"));
    }

    #[test]
    fn test_stale_add_rejected() {
        let set = LwwElementSet::new();
        assert!(set.add("element", 10));
        assert!(!set.add("element", 5));
        assert_eq!(set.timestamp_of(&"element"), Some(10));
        assert_eq!(set.track_len(), (1, 0));
    }

    #[test]
    fn test_stale_check_is_per_value() {
        let set = LwwElementSet::new();
        set.add("a", 50);
        assert!(set.add("b", 10));
    }

    #[test]
    fn test_stale_remove_rejected() {
        let set = LwwElementSet::new();
        set.add("element", 1);
        assert!(set.remove("element", 30));
        assert!(!set.remove("element", 20));
        assert_eq!(set.track_len(), (1, 1));
    }

    #[test]
    fn test_equal_timestamp_add_accepted() {
        let set = LwwElementSet::new();
        assert!(set.add("element", 10));
        assert!(set.add("element", 10));
        assert_eq!(set.track_len(), (1, 0));
    }

    #[test]
    fn test_tie_favors_add() {
        let set = LwwElementSet::new();
        set.add("a", 10);
        set.remove("a", 10);
        assert!(set.contains(&"a"));

        let set = LwwElementSet::new();
        set.remove("b", 10);
        set.add("b", 10);
        assert!(set.contains(&"b"));
    }

    #[test]
    fn test_clear_removes_present_values() {
        let set = LwwElementSet::new();
        set.add("a", 10);
        set.add("b", 20);
        set.clear(30);
        assert!(set.is_empty());
        assert_eq!(set.track_len(), (2, 2));

        // A value added after the clear timestamp survives a late clear.
        set.add("c", 40);
        set.clear(35);
        assert!(set.contains(&"c"));
    }

    #[test]
    fn test_clear_on_empty_is_noop() {
        let set: LwwElementSet<&str> = LwwElementSet::new();
        set.clear(10);
        assert_eq!(set.track_len(), (0, 0));
    }

    #[test]
    fn test_iter_yields_present_only() {
        let set = LwwElementSet::new();
        set.add("a", 1);
        set.add("b", 2);
        set.add("c", 3);
        set.remove("b", 4);
        let present: HashSet<&str> = set.iter().collect();
        assert_eq!(present, HashSet::from(["a", "c"]));
    }

    #[test]
    fn test_view_is_live() {
        let set = LwwElementSet::new();
        set.add("a", 1);
        let view = set.view();
        assert_eq!((&view).into_iter().count(), 1);

        set.add("b", 2);
        set.remove("a", 3);
        let present: HashSet<&str> = view.iter().collect();
        assert_eq!(present, HashSet::from(["b"]));
    }

    #[test]
    fn test_clone_shares_state() {
        let set = LwwElementSet::new();
        let handle = set.clone();
        handle.add("shared", 1);
        assert!(set.contains(&"shared"));
        assert_eq!(set, handle);
        assert_ne!(set, LwwElementSet::new());
    }

    #[test]
    fn test_merge_unions_tracks() {
        let a = LwwElementSet::new();
        let b = LwwElementSet::new();
        a.add("x", 10);
        b.remove("x", 20);
        b.add("y", 5);

        a.merge(&b);
        assert!(!a.contains(&"x"));
        assert!(a.contains(&"y"));
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn test_merge_keeps_entries_the_stale_rule_would_reject() {
        let a = LwwElementSet::new();
        let b = LwwElementSet::new();
        a.add("x", 30);
        b.add("x", 10);
        a.merge(&b);
        assert_eq!(a.track_len(), (2, 0));
        assert_eq!(a.timestamp_of(&"x"), Some(30));
    }

    #[test]
    fn test_merge_with_self_is_noop() {
        let a = LwwElementSet::new();
        a.add("x", 1);
        a.merge(&a.clone());
        assert_eq!(a.track_len(), (1, 0));
        assert!(a.dominates(&a));
    }

    #[test]
    fn test_debug_lists_present_values() {
        let set = LwwElementSet::new();
        set.add("a", 1);
        assert_eq!(format!("{set:?}"), "{\"a\"}");
    }
}
