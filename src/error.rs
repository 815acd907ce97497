//! Error types for the replication session.

use crate::model::CommandError;
use crate::transport::TransportError;
use tandem_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced to the code driving a [`Session`](crate::session::Session).
///
/// Stale writes are not errors; they come back as
/// [`Outcome::Stale`](crate::model::Outcome::Stale).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Local input did not parse.
    #[error("invalid command: {0}")]
    Command(#[from] CommandError),

    /// An outgoing message could not be encoded.
    #[error("cannot encode message: {0}")]
    Protocol(#[from] ProtocolError),

    /// Publishing or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Returns `true` if the error was caused by the input rather than the network.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Command(_) | Self::Protocol(_))
    }
}
