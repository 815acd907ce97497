//! Core CRDT traits for replica-to-replica state synchronization.

/// A Conflict-free Replicated Data Type.
///
/// Every structure in this crate is a shared handle with interior
/// synchronization, so merging takes `&self`.
pub trait Crdt {
    /// Merge another replica's state into this one.
    ///
    /// This operation is:
    /// - **Idempotent**: `a.merge(a)` == `a`
    /// - **Commutative** and **associative** as long as no two replicas wrote
    ///   different values for the same register or map key at the same
    ///   timestamp. On such a tie the receiving side keeps its own value, so
    ///   the two sides stay divergent. Set membership has no value to pick
    ///   and converges regardless.
    ///
    /// Timestamps from [`Clock`](crate::Clock) never repeat within a replica;
    /// distinct replicas sharing a timestamp is the only source of ties.
    fn merge(&self, other: &Self);

    /// Check if this instance already contains everything `other` knows.
    ///
    /// Returns `true` if merging `other` into `self` would not change `self`.
    fn dominates(&self, other: &Self) -> bool;
}
