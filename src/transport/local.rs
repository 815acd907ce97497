//! In-process transport.
//!
//! A [`LocalBus`] plays the hub's role inside one process: a broadcast
//! channel for live payloads plus a replay log for snapshots. Used by tests
//! and by applications that host several replicas together.

use super::{Publish, SnapshotSource, Subscribe, TransportError};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use tandem_proto::{Envelope, ReplicaId};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const DEFAULT_CAPACITY: usize = 1024;

struct BusInner {
    hub: ReplicaId,
    tx: Mutex<Option<broadcast::Sender<String>>>,
    log: RwLock<Vec<String>>,
}

/// An in-process publish/subscribe bus with a replay log.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    /// Creates a bus whose snapshot sentinel is signed by `hub`.
    pub fn new(hub: ReplicaId) -> Self {
        Self::with_capacity(hub, DEFAULT_CAPACITY)
    }

    /// Creates a bus whose subscribers may fall `capacity` payloads behind.
    pub fn with_capacity(hub: ReplicaId, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(BusInner {
                hub,
                tx: Mutex::new(Some(tx)),
                log: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn publisher(&self) -> LocalPublisher {
        LocalPublisher { bus: self.clone() }
    }

    /// A subscriber that receives everything published from now on.
    ///
    /// After [`close`](Self::close) the subscriber reports
    /// [`TransportError::Closed`] immediately.
    pub fn subscribe(&self) -> LocalSubscriber {
        let rx = self.inner.tx.lock().as_ref().map(broadcast::Sender::subscribe);
        LocalSubscriber { rx }
    }

    pub fn snapshot(&self) -> LocalSnapshot {
        LocalSnapshot {
            bus: self.clone(),
            pending: None,
        }
    }

    /// Number of payloads in the replay log.
    pub fn log_len(&self) -> usize {
        self.inner.log.read().len()
    }

    /// Stops the bus: subscribers drain what they have, then see `Closed`.
    pub fn close(&self) {
        self.inner.tx.lock().take();
    }
}

/// Publishing half of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalPublisher {
    bus: LocalBus,
}

#[async_trait]
impl Publish for LocalPublisher {
    async fn publish(&self, payload: String) -> Result<(), TransportError> {
        let tx = self.bus.inner.tx.lock();
        let tx = tx.as_ref().ok_or(TransportError::Closed)?;
        self.bus.inner.log.write().push(payload.clone());
        // No subscribers is not an error; the payload is still logged.
        let _ = tx.send(payload);
        Ok(())
    }
}

/// Receiving half of a [`LocalBus`].
pub struct LocalSubscriber {
    rx: Option<broadcast::Receiver<String>>,
}

#[async_trait]
impl Subscribe for LocalSubscriber {
    async fn recv(&mut self) -> Result<String, TransportError> {
        let rx = self.rx.as_mut().ok_or(TransportError::Closed)?;
        match rx.recv().await {
            Ok(payload) => Ok(payload),
            Err(RecvError::Closed) => Err(TransportError::Closed),
            Err(RecvError::Lagged(missed)) => Err(TransportError::Lagged(missed)),
        }
    }
}

/// Snapshot channel of a [`LocalBus`].
///
/// A request captures the replay log at that moment followed by the
/// sentinel; once the captured lines run out the channel reports `Closed`.
pub struct LocalSnapshot {
    bus: LocalBus,
    pending: Option<VecDeque<String>>,
}

#[async_trait]
impl SnapshotSource for LocalSnapshot {
    async fn request(&mut self) -> Result<(), TransportError> {
        let mut lines: VecDeque<String> = self.bus.inner.log.read().iter().cloned().collect();
        lines.push_back(Envelope::finished_snapshot(self.bus.inner.hub.clone()).to_string());
        self.pending = Some(lines);
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        self.pending
            .as_mut()
            .and_then(VecDeque::pop_front)
            .ok_or(TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> LocalBus {
        LocalBus::new(ReplicaId::new("hub").unwrap())
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = bus();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publisher().publish("[x] 1 NODE n".into()).await.unwrap();
        assert_eq!(a.recv().await.unwrap(), "[x] 1 NODE n");
        assert_eq!(b.recv().await.unwrap(), "[x] 1 NODE n");
        assert_eq!(bus.log_len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_replays_log_then_sentinel() {
        let bus = bus();
        let publisher = bus.publisher();
        publisher.publish("[x] 1 NODE a".into()).await.unwrap();
        publisher.publish("[y] 2 NODE b".into()).await.unwrap();

        let mut snapshot = bus.snapshot();
        assert!(matches!(snapshot.recv().await, Err(TransportError::Closed)));
        snapshot.request().await.unwrap();
        assert_eq!(snapshot.recv().await.unwrap(), "[x] 1 NODE a");
        assert_eq!(snapshot.recv().await.unwrap(), "[y] 2 NODE b");
        assert_eq!(snapshot.recv().await.unwrap(), "[hub] finished_snapshot");
        assert!(matches!(snapshot.recv().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let bus = bus();
        let mut sub = bus.subscribe();
        bus.publisher().publish("[x] 1 NODE a".into()).await.unwrap();
        bus.close();

        assert_eq!(sub.recv().await.unwrap(), "[x] 1 NODE a");
        assert!(matches!(sub.recv().await, Err(TransportError::Closed)));
        assert!(matches!(bus.subscribe().recv().await, Err(TransportError::Closed)));
        assert!(bus.publisher().publish("late".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = LocalBus::with_capacity(ReplicaId::new("hub").unwrap(), 2);
        let mut sub = bus.subscribe();
        let publisher = bus.publisher();
        for i in 0..5 {
            publisher.publish(format!("[x] {i} NODE n")).await.unwrap();
        }
        assert!(matches!(sub.recv().await, Err(TransportError::Lagged(3))));
        assert_eq!(sub.recv().await.unwrap(), "[x] 3 NODE n");
    }
}
