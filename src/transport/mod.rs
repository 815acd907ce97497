//! Transports between replicas and the relay hub.
//!
//! A replica needs three channels:
//!
//! - [`Publish`]: push a payload to every other replica.
//! - [`Subscribe`]: receive payloads published by any replica.
//! - [`SnapshotSource`]: ask for the history so far and stream it back.
//!
//! Payloads are envelope lines (`"[sender] body"`); transports do not look
//! inside them. [`local`] wires the three channels inside one process,
//! [`tcp`] talks to a [`Hub`](crate::hub::Hub) over TCP.

pub mod local;
pub mod tcp;

use async_trait::async_trait;
use tandem_proto::ProtocolError;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors raised by transports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// An I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be framed or parsed.
    #[error("transport protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The line codec rejected a line.
    #[error("transport codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// The other side went away.
    #[error("transport closed")]
    Closed,

    /// A subscriber fell behind and missed payloads.
    #[error("subscriber lagged; {0} payloads dropped")]
    Lagged(u64),
}

/// Sends payloads to every subscriber of the topic.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, payload: String) -> Result<(), TransportError>;
}

/// Yields payloads published by any replica, in arrival order.
#[async_trait]
pub trait Subscribe: Send {
    /// Waits for the next payload. [`TransportError::Closed`] ends the stream.
    async fn recv(&mut self) -> Result<String, TransportError>;
}

/// A point-to-point channel that replays history on request.
#[async_trait]
pub trait SnapshotSource: Send {
    /// Sends the snapshot request.
    async fn request(&mut self) -> Result<(), TransportError>;

    /// Waits for the next line of the snapshot stream.
    async fn recv(&mut self) -> Result<String, TransportError>;
}
