//! TCP clients for the [`Hub`](crate::hub::Hub)'s three endpoints.
//!
//! Every connection is newline-delimited UTF-8 (`LinesCodec`). Pub/sub lines
//! are [`Frame`]s: `"<topic> <payload>"`. A subscriber sends its topic as its
//! first line; the snapshot endpoint expects `request_snapshot`.

use super::{Publish, SnapshotSource, Subscribe, TransportError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tandem_proto::{Frame, MAX_LINE_LEN, REQUEST_SNAPSHOT};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, FramedWrite, LinesCodec};
use tracing::{debug, warn};

const OUTBOUND_QUEUE: usize = 256;

fn codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_LINE_LEN)
}

/// Publishes frames to the hub's publish endpoint.
///
/// Writes go through a background writer task so `publish` only waits for
/// queue space, never for the socket.
pub struct TcpPublisher {
    topic: String,
    tx: mpsc::Sender<String>,
}

impl TcpPublisher {
    pub async fn connect(addr: SocketAddr, topic: impl Into<String>) -> Result<Self, TransportError> {
        let topic = topic.into();
        tandem_proto::validate_topic(&topic)?;
        let stream = TcpStream::connect(addr).await?;
        let mut writer = FramedWrite::new(stream, codec());
        let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = writer.send(line).await {
                    warn!(%addr, error = %e, "Publish connection failed");
                    break;
                }
            }
            debug!(%addr, "Publisher writer stopped");
        });

        Ok(Self { topic, tx })
    }
}

#[async_trait]
impl Publish for TcpPublisher {
    async fn publish(&self, payload: String) -> Result<(), TransportError> {
        let line = Frame::new(self.topic.as_str(), payload)?.encode()?;
        self.tx.send(line).await.map_err(|_| TransportError::Closed)
    }
}

/// Receives frames for one topic from the hub's subscribe endpoint.
pub struct TcpSubscriber {
    topic: String,
    framed: Framed<TcpStream, LinesCodec>,
}

impl TcpSubscriber {
    pub async fn connect(addr: SocketAddr, topic: impl Into<String>) -> Result<Self, TransportError> {
        let topic = topic.into();
        tandem_proto::validate_topic(&topic)?;
        let stream = TcpStream::connect(addr).await?;
        let mut framed = Framed::new(stream, codec());
        framed.send(topic.as_str()).await?;
        Ok(Self { topic, framed })
    }
}

#[async_trait]
impl Subscribe for TcpSubscriber {
    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            let line = match self.framed.next().await {
                Some(line) => line?,
                None => return Err(TransportError::Closed),
            };
            match line.parse::<Frame>() {
                Ok(frame) if frame.topic() == self.topic => return Ok(frame.into_payload()),
                Ok(frame) => debug!(topic = frame.topic(), "Ignoring frame for another topic"),
                Err(e) => warn!(error = %e, "Ignoring malformed frame"),
            }
        }
    }
}

/// Requests and streams a snapshot from the hub's snapshot endpoint.
pub struct TcpSnapshot {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TcpSnapshot {
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, codec()),
        })
    }
}

#[async_trait]
impl SnapshotSource for TcpSnapshot {
    async fn request(&mut self) -> Result<(), TransportError> {
        self.framed.send(REQUEST_SNAPSHOT).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        match self.framed.next().await {
            Some(line) => Ok(line?),
            None => Err(TransportError::Closed),
        }
    }
}
