//! tandem - collaborative graph editing over last-writer-wins CRDTs.
//!
//! Every replica holds a full copy of a property graph built from the
//! structures in [`tandem_crdt`]. Local edits are stamped, applied, and
//! published through a relay [`hub`]; remote edits arrive on a subscription
//! and are replayed in whatever order they come. A replica that starts late
//! asks the hub for a snapshot of everything published so far.
//!
//! The crate is split into:
//!
//! - [`model`]: the replicated graph and the text commands that edit it.
//! - [`session`]: one replica's apply, publish, receive, and join logic.
//! - [`transport`]: publish/subscribe/snapshot channels, in-process and TCP.
//! - [`hub`]: the TCP relay with its replay log.
//! - [`config`] and [`telemetry`]: TOML configuration and `tracing` setup.

pub mod config;
pub mod error;
pub mod hub;
pub mod model;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use config::Config;
pub use error::SessionError;
pub use hub::{Hub, HubAddrs};
pub use model::{Command, CommandError, Model, Mutation, Outcome};
pub use session::{Delivery, JoinReport, LiveReport, Session};
pub use transport::{Publish, SnapshotSource, Subscribe, TransportError};
