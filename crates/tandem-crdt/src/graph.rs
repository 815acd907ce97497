//! Graph primitives.
//!
//! [`Vertex`] and [`Edge`] are property bags for the nodes and connections of
//! a property graph. Each wraps an [`LwwMap`] and exposes exactly the map's
//! operations; the only addition is a [`GraphRole`] telling graph code which
//! structural part it is looking at.

use crate::clock::Timestamp;
use crate::map::{Entries, Keys, LwwMap};
use crate::traits::Crdt;
use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The structural role of a graph primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphRole {
    Vertex,
    Edge,
}

impl GraphRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for GraphRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defines a role-tagged wrapper around [`LwwMap`] that forwards the map API.
macro_rules! graph_primitive {
    (
        $(#[$meta:meta])*
        $name:ident => $role:expr
    ) => {
        $(#[$meta])*
        pub struct $name<K = String, V = Value> {
            map: LwwMap<K, V>,
        }

        impl<K, V> $name<K, V> {
            /// The role every instance of this type carries.
            pub const ROLE: GraphRole = $role;

            /// Creates an empty property bag.
            #[must_use]
            pub fn new() -> Self {
                Self { map: LwwMap::new() }
            }

            /// Wraps an existing map handle; the map stays shared.
            #[must_use]
            pub fn from_map(map: LwwMap<K, V>) -> Self {
                Self { map }
            }

            #[must_use]
            pub fn role(&self) -> GraphRole {
                Self::ROLE
            }

            /// The underlying map handle.
            #[must_use]
            pub fn as_map(&self) -> &LwwMap<K, V> {
                &self.map
            }

            #[must_use]
            pub fn same_as(&self, other: &Self) -> bool {
                self.map.same_as(&other.map)
            }
        }

        impl<K, V> $name<K, V>
        where
            K: Clone + Eq + Hash,
            V: Clone,
        {
            /// See [`LwwMap::add`].
            pub fn add(&self, key: K, value: V, timestamp: Timestamp) -> bool {
                self.map.add(key, value, timestamp)
            }

            /// See [`LwwMap::remove`].
            pub fn remove(&self, key: K, timestamp: Timestamp) -> bool {
                self.map.remove(key, timestamp)
            }

            pub fn contains_key(&self, key: &K) -> bool {
                self.map.contains_key(key)
            }

            pub fn get(&self, key: &K) -> Option<V> {
                self.map.get(key)
            }

            pub fn last_value(&self, key: &K) -> Option<V> {
                self.map.last_value(key)
            }

            pub fn timestamp_of(&self, key: &K) -> Option<Timestamp> {
                self.map.timestamp_of(key)
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.map.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.map.is_empty()
            }

            pub fn clear(&self, timestamp: Timestamp) {
                self.map.clear(timestamp);
            }

            #[must_use]
            pub fn keys(&self) -> Keys<K, V> {
                self.map.keys()
            }

            #[must_use]
            pub fn entries(&self) -> Entries<K, V> {
                self.map.entries()
            }
        }

        impl<K, V> Crdt for $name<K, V>
        where
            K: Clone + Eq + Hash,
            V: Clone,
        {
            fn merge(&self, other: &Self) {
                self.map.merge(&other.map);
            }

            fn dominates(&self, other: &Self) -> bool {
                self.map.dominates(&other.map)
            }
        }

        impl<K, V> Clone for $name<K, V> {
            fn clone(&self) -> Self {
                Self { map: self.map.clone() }
            }
        }

        impl<K, V> Default for $name<K, V> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<K, V> PartialEq for $name<K, V> {
            fn eq(&self, other: &Self) -> bool {
                self.same_as(other)
            }
        }

        impl<K, V> Eq for $name<K, V> {}

        impl<K, V> Hash for $name<K, V> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.map.hash(state);
            }
        }

        impl<K, V> fmt::Debug for $name<K, V>
        where
            K: Clone + Eq + Hash + fmt::Debug,
            V: Clone + fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.map).finish()
            }
        }

        impl<K, V> From<$name<K, V>> for LwwMap<K, V> {
            fn from(primitive: $name<K, V>) -> Self {
                primitive.map
            }
        }
    };
}

graph_primitive! {
    /// Properties of a graph node.
    ///
    /// ```rust
    /// use tandem_crdt::{GraphRole, Vertex};
    ///
    /// let person: Vertex = Vertex::new();
    /// person.add("name".into(), "Ada".into(), 1);
    /// assert_eq!(person.role(), GraphRole::Vertex);
    /// assert_eq!(person.len(), 1);
    /// ```
    Vertex => GraphRole::Vertex
}

graph_primitive! {
    /// Properties of a connection between two graph nodes.
    Edge => GraphRole::Edge
}
