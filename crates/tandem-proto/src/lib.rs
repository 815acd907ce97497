//! Wire vocabulary for tandem replication.
//!
//! Every line on every channel is UTF-8 text:
//!
//! ```text
//! pub/sub channels   <topic> [<sender>] <timestamp> <command...>
//! snapshot request   request_snapshot
//! snapshot stream    [<sender>] <timestamp> <command...>
//!                    [<hub>] finished_snapshot
//! ```
//!
//! - [`ReplicaId`]: who sent a message; used for echo suppression.
//! - [`Envelope`]: the `"[sender] body"` message.
//! - [`Frame`]: an envelope line scoped to a topic.
//! - [`control`]: snapshot literals and line limits.

pub mod control;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod replica;

pub use control::{
    check_line, is_finished_snapshot, validate_topic, DEFAULT_TOPIC, FINISHED_SNAPSHOT,
    MAX_LINE_LEN, REQUEST_SNAPSHOT,
};
pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use frame::Frame;
pub use replica::ReplicaId;
