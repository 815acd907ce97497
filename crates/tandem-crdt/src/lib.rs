//! Last-Writer-Wins CRDTs for collaborative graph editing.
//!
//! Replicas edit their own copies of the same structures and exchange the
//! edits in any order, any number of times. Every mutation carries a
//! [`Timestamp`]; conflicts are settled by comparing timestamps alone, so all
//! replicas that have seen the same edits hold the same state.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │  Vertex / Edge      role-tagged property bags      │
//! ├────────────────────────────────────────────────────┤
//! │  LwwMap<K, V>       key presence + value records   │
//! ├───────────────────────────┬────────────────────────┤
//! │  LwwElementSet<V>         │  LwwRegister<V>        │
//! │  add-track / remove-track │  single (value, ts)    │
//! └───────────────────────────┴────────────────────────┘
//!           Value: plain text or an embedded structure
//! ```
//!
//! # Types
//!
//! - **[`LwwElementSet`]**: append-only add and remove tracks; a value is
//!   present when its newest add is at least as new as its newest remove.
//! - **[`LwwRegister`]**: one cell; strictly older writes are rejected.
//! - **[`LwwMap`]**: a key set plus the newest accepted value per key.
//! - **[`Vertex`] / [`Edge`]**: maps tagged with a [`GraphRole`].
//! - **[`Value`]**: a slot holding plain text or another structure by handle.
//! - **[`Clock`]**: monotonic timestamps for local edits.
//!
//! All structures are cheap-to-clone shared handles with internal locking.
//! Stale writes are not errors: mutators return `false` and change nothing.

pub mod clock;
pub mod graph;
pub mod map;
pub mod register;
pub mod set;
pub mod traits;
pub mod value;

pub use clock::{Clock, Timestamp};
pub use graph::{Edge, GraphRole, Vertex};
pub use map::{Entries, Keys, LwwMap};
pub use register::LwwRegister;
pub use set::{LwwElementSet, SetView};
pub use traits::Crdt;
pub use value::Value;
