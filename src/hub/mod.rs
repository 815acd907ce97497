//! Relay hub.
//!
//! The hub is the rendezvous point replicas connect to. It owns no CRDT state:
//! it relays every payload published on its topic to every subscriber and
//! keeps an append-only log of those payloads so late joiners can replay them.
//!
//! ```text
//!   replica ──publish──▶ ┌─────────┐ ──subscribe──▶ replicas
//!                        │   Hub   │
//!   replica ◀─snapshot── │  + log  │
//!                        └─────────┘
//! ```

use crate::config::HubConfig;
use crate::telemetry::spans;
use crate::transport::TransportError;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tandem_proto::{Envelope, Frame, ReplicaId, MAX_LINE_LEN, REQUEST_SNAPSHOT};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn, Instrument};

const FANOUT_CAPACITY: usize = 4096;

/// Addresses the hub's listeners are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubAddrs {
    pub publish: SocketAddr,
    pub subscribe: SocketAddr,
    pub snapshot: SocketAddr,
}

/// State shared by every connection task.
struct Shared {
    id: ReplicaId,
    topic: String,
    log: RwLock<Vec<String>>,
    fanout: broadcast::Sender<String>,
}

/// The relay hub: three bound listeners plus the replay log.
pub struct Hub {
    publish: TcpListener,
    subscribe: TcpListener,
    snapshot: TcpListener,
    shared: Arc<Shared>,
}

impl Hub {
    /// Binds the three endpoints named in `config`.
    pub async fn bind(config: &HubConfig) -> Result<Self, TransportError> {
        let id = ReplicaId::new(config.id.as_str())?;
        tandem_proto::validate_topic(&config.topic)?;

        let publish = TcpListener::bind(config.publish).await?;
        let subscribe = TcpListener::bind(config.subscribe).await?;
        let snapshot = TcpListener::bind(config.snapshot).await?;
        let (fanout, _) = broadcast::channel(FANOUT_CAPACITY);

        let hub = Self {
            publish,
            subscribe,
            snapshot,
            shared: Arc::new(Shared {
                id,
                topic: config.topic.clone(),
                log: RwLock::new(Vec::new()),
                fanout,
            }),
        };
        let addrs = hub.local_addrs()?;
        info!(
            publish = %addrs.publish,
            subscribe = %addrs.subscribe,
            snapshot = %addrs.snapshot,
            topic = %hub.shared.topic,
            "Hub listeners bound"
        );
        Ok(hub)
    }

    /// The bound addresses; useful when the config asked for port 0.
    pub fn local_addrs(&self) -> std::io::Result<HubAddrs> {
        Ok(HubAddrs {
            publish: self.publish.local_addr()?,
            subscribe: self.subscribe.local_addr()?,
            snapshot: self.snapshot.local_addr()?,
        })
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self) {
        let span = spans::hub(self.shared.id.as_str(), &self.shared.topic);
        async move {
            loop {
                tokio::select! {
                    res = self.publish.accept() => {
                        self.spawn(res, "publish", handle_publisher);
                    }
                    res = self.subscribe.accept() => {
                        self.spawn(res, "subscribe", handle_subscriber);
                    }
                    res = self.snapshot.accept() => {
                        self.spawn(res, "snapshot", handle_snapshot);
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn spawn<F, Fut>(
        &self,
        accepted: std::io::Result<(TcpStream, SocketAddr)>,
        endpoint: &'static str,
        handler: F,
    ) where
        F: FnOnce(Arc<Shared>, Framed<TcpStream, LinesCodec>) -> Fut,
        Fut: std::future::Future<Output = Result<(), TransportError>> + Send + 'static,
    {
        match accepted {
            Ok((stream, peer)) => {
                debug!(%peer, endpoint, "Accepted connection");
                let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LEN));
                let task = handler(Arc::clone(&self.shared), framed);
                tokio::spawn(
                    async move {
                        match task.await {
                            Ok(()) => debug!("Connection closed"),
                            Err(e) => warn!(error = %e, "Connection failed"),
                        }
                    }
                    .instrument(spans::connection(endpoint, &peer)),
                );
            }
            Err(e) => {
                error!(endpoint, error = %e, "Failed to accept connection");
            }
        }
    }

    /// Number of payloads in the replay log.
    pub fn log_len(&self) -> usize {
        self.shared.log.read().len()
    }
}

/// Reads frames, logs accepted payloads, and fans them out.
async fn handle_publisher(
    shared: Arc<Shared>,
    mut framed: Framed<TcpStream, LinesCodec>,
) -> Result<(), TransportError> {
    while let Some(line) = framed.next().await {
        let line = line?;
        let frame = match line.parse::<Frame>() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                continue;
            }
        };
        if frame.topic() != shared.topic {
            debug!(topic = frame.topic(), "Dropping frame for another topic");
            continue;
        }
        if let Err(e) = frame.payload().parse::<Envelope>() {
            warn!(error = %e, "Dropping frame without a valid envelope");
            continue;
        }
        // Log and fan out under one lock: a snapshot includes every relayed payload.
        {
            let mut log = shared.log.write();
            log.push(frame.into_payload());
            let _ = shared.fanout.send(line);
        }
    }
    Ok(())
}

/// Waits for the subscriber's topic line, then relays matching frames.
async fn handle_subscriber(
    shared: Arc<Shared>,
    mut framed: Framed<TcpStream, LinesCodec>,
) -> Result<(), TransportError> {
    let Some(topic) = framed.next().await.transpose()? else {
        return Ok(());
    };
    let topic = topic.trim().to_owned();
    if topic != shared.topic {
        warn!(%topic, "Subscriber asked for an unknown topic; closing");
        return Ok(());
    }
    let mut rx = shared.fanout.subscribe();

    loop {
        tokio::select! {
            relayed = rx.recv() => match relayed {
                Ok(line) => framed.send(line).await?,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber lagged; payloads dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            incoming = framed.next() => match incoming {
                // Subscribers have nothing more to say; anything else is ignored.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Answers one `request_snapshot` with the log and the sentinel.
async fn handle_snapshot(
    shared: Arc<Shared>,
    mut framed: Framed<TcpStream, LinesCodec>,
) -> Result<(), TransportError> {
    let Some(request) = framed.next().await.transpose()? else {
        return Ok(());
    };
    if request.trim() != REQUEST_SNAPSHOT {
        warn!(%request, "Unexpected snapshot request; closing");
        return Ok(());
    }

    let lines: Vec<String> = shared.log.read().clone();
    let count = lines.len();
    for line in lines {
        framed.send(line).await?;
    }
    framed
        .send(Envelope::finished_snapshot(shared.id.clone()).to_string())
        .await?;
    info!(count, "Snapshot served");
    Ok(())
}
