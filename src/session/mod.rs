//! Replication session.
//!
//! A session ties one replica's [`Model`] to the transports:
//!
//! ```text
//!            ┌──────────── submit(line) ◀── local input
//!            ▼
//!   Clock ─▶ Model ◀── receive(line) ◀── run_live(Subscribe)
//!            │    ◀─── join(SnapshotSource)
//!            ▼
//!        Publish ──▶ "[me] <ts> <command>"
//! ```
//!
//! Local edits are applied first, then published unless the command is a
//! query or configured as local-only. Incoming messages from this replica's
//! own identity are discarded. A joining replica drains the snapshot stream
//! up to the `finished_snapshot` sentinel; a broken or silent stream ends the
//! join without failing it.
//!
//! `join` and `run_live` are meant to run as separate tasks alongside the
//! input loop. They share nothing but the session, whose model and clock are
//! internally synchronized.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::model::{Command, CommandError, Model, Mutation, Outcome};
use crate::transport::{Publish, SnapshotSource, Subscribe, TransportError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tandem_crdt::Clock;
use tandem_proto::{Envelope, ReplicaId};
use tracing::{debug, info, warn};

/// What happened to one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The mutation was applied.
    Applied,
    /// The mutation lost to a newer write.
    Stale,
    /// The message came from this replica and was discarded.
    Echo,
    /// The message could not be parsed and was discarded.
    Malformed,
}

/// Summary of a snapshot join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub applied: usize,
    pub stale: usize,
    pub malformed: usize,
    /// `true` if the sentinel arrived; `false` if the stream broke off.
    pub completed: bool,
}

/// Summary of a live subscription that has ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveReport {
    pub applied: usize,
    pub stale: usize,
    pub echoes: usize,
    pub malformed: usize,
    /// Payloads the transport dropped because this replica fell behind.
    pub lagged: u64,
}

impl LiveReport {
    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Applied => self.applied += 1,
            Delivery::Stale => self.stale += 1,
            Delivery::Echo => self.echoes += 1,
            Delivery::Malformed => self.malformed += 1,
        }
    }
}

/// One replica's view of the shared model plus its publishing channel.
pub struct Session {
    identity: ReplicaId,
    model: Arc<Model>,
    clock: Arc<Clock>,
    publisher: Arc<dyn Publish>,
    local_only: HashSet<String>,
    snapshot_timeout: Duration,
}

impl Session {
    /// Creates a session with default settings and an empty model.
    pub fn new(identity: ReplicaId, publisher: Arc<dyn Publish>) -> Self {
        Self::from_config(identity, &SessionConfig::default(), publisher)
    }

    pub fn from_config(
        identity: ReplicaId,
        config: &SessionConfig,
        publisher: Arc<dyn Publish>,
    ) -> Self {
        Self {
            identity,
            model: Arc::new(Model::new()),
            clock: Arc::new(Clock::new()),
            publisher,
            local_only: config
                .local_only
                .iter()
                .map(|keyword| keyword.to_ascii_uppercase())
                .collect(),
            snapshot_timeout: config.snapshot_timeout(),
        }
    }

    /// Uses an existing model instead of an empty one.
    #[must_use]
    pub fn with_model(mut self, model: Arc<Model>) -> Self {
        self.model = model;
        self
    }

    /// Uses an existing clock, e.g. one shared with other sessions.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn identity(&self) -> &ReplicaId {
        &self.identity
    }

    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    /// Returns `true` if `command` is published after being applied locally.
    #[must_use]
    pub fn is_forwarded(&self, command: &Command) -> bool {
        !command.is_query() && !self.local_only.contains(command.keyword())
    }

    /// Handles one line of local input.
    ///
    /// The command is stamped with [`Clock::now`], applied to the local model,
    /// and then published if it is forwarded. The outcome of the local apply
    /// is returned; a publish failure is reported as an error even though the
    /// local apply already happened.
    pub async fn submit(&self, input: &str) -> Result<Outcome, SessionError> {
        let command: Command = input.parse()?;
        let at = self.clock.now();
        let outcome = self.model.execute(&command, at);

        if self.is_forwarded(&command) {
            let body = Mutation::new(at, command).to_string();
            let line = Envelope::new(self.identity.clone(), body).encode()?;
            self.publisher.publish(line).await?;
        }
        Ok(outcome)
    }

    /// Handles one message from the live subscription.
    pub fn receive(&self, line: &str) -> Delivery {
        let envelope = match line.parse::<Envelope>() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping malformed message");
                return Delivery::Malformed;
            }
        };
        if envelope.is_from(&self.identity) {
            debug!(body = envelope.body(), "Discarding echo");
            return Delivery::Echo;
        }
        self.deliver(envelope.sender(), envelope.body())
    }

    fn deliver(&self, sender: &ReplicaId, body: &str) -> Delivery {
        match self.apply_body(body) {
            Ok(Outcome::Stale) => {
                debug!(%sender, body, "Remote mutation was stale");
                Delivery::Stale
            }
            Ok(_) => {
                debug!(%sender, body, "Applied remote mutation");
                Delivery::Applied
            }
            Err(e) => {
                warn!(%sender, error = %e, "Dropping message with invalid body");
                Delivery::Malformed
            }
        }
    }

    fn apply_body(&self, body: &str) -> Result<Outcome, CommandError> {
        let mutation: Mutation = body.parse()?;
        self.clock.observe(mutation.at);
        Ok(self.model.apply(&mutation))
    }

    /// Requests a snapshot and applies it up to the sentinel.
    ///
    /// Never fails: a refused request, a transport error, or a stream silent
    /// for longer than the snapshot timeout ends the join with
    /// `completed: false`. Anything still buffered after the sentinel is left
    /// unread.
    pub async fn join<S>(&self, source: &mut S) -> JoinReport
    where
        S: SnapshotSource + ?Sized,
    {
        let mut report = JoinReport::default();
        if let Err(e) = source.request().await {
            warn!(error = %e, "Snapshot request failed; continuing without snapshot");
            return report;
        }

        loop {
            let line = match tokio::time::timeout(self.snapshot_timeout, source.recv()).await {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    warn!(error = %e, applied = report.applied, "Snapshot interrupted");
                    return report;
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.snapshot_timeout.as_millis() as u64,
                        applied = report.applied,
                        "Snapshot stalled"
                    );
                    return report;
                }
            };

            let envelope = match line.parse::<Envelope>() {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed snapshot line");
                    report.malformed += 1;
                    continue;
                }
            };
            if envelope.is_finished_snapshot() {
                report.completed = true;
                info!(
                    applied = report.applied,
                    stale = report.stale,
                    "Snapshot applied"
                );
                return report;
            }
            // Snapshot lines are applied even when they carry our own id:
            // they are history this process has not seen.
            match self.deliver(envelope.sender(), envelope.body()) {
                Delivery::Applied => report.applied += 1,
                Delivery::Stale => report.stale += 1,
                Delivery::Echo | Delivery::Malformed => report.malformed += 1,
            }
        }
    }

    /// Applies live messages until the subscription closes or fails.
    pub async fn run_live<S>(&self, subscriber: &mut S) -> LiveReport
    where
        S: Subscribe + ?Sized,
    {
        let mut report = LiveReport::default();
        loop {
            match subscriber.recv().await {
                Ok(line) => report.record(self.receive(&line)),
                Err(TransportError::Lagged(missed)) => {
                    warn!(missed, "Live subscription lagged; payloads lost");
                    report.lagged += missed;
                }
                Err(TransportError::Closed) => {
                    info!(applied = report.applied, "Live subscription closed");
                    return report;
                }
                Err(e) => {
                    warn!(error = %e, applied = report.applied, "Live subscription failed");
                    return report;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::local::LocalBus;
    use parking_lot::Mutex;

    /// Records everything published instead of sending it.
    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Publish for Recorder {
        async fn publish(&self, payload: String) -> Result<(), TransportError> {
            self.sent.lock().push(payload);
            Ok(())
        }
    }

    fn id(s: &str) -> ReplicaId {
        ReplicaId::new(s).unwrap()
    }

    fn session(name: &str) -> (Session, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (Session::new(id(name), recorder.clone()), recorder)
    }

    #[tokio::test]
    async fn test_submit_applies_then_publishes() {
        let (session, recorder) = session("alice");
        let outcome = session.submit("NODE n1").await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert!(session.model().node("n1").is_some());

        let sent = recorder.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        let envelope: Envelope = sent[0].parse().unwrap();
        assert!(envelope.is_from(&id("alice")));
        let mutation: Mutation = envelope.body().parse().unwrap();
        assert_eq!(mutation.command, Command::Node { id: "n1".into() });
    }

    #[tokio::test]
    async fn test_queries_are_never_published() {
        let (session, recorder) = session("alice");
        session.submit("NODE n1").await.unwrap();
        let read = session.submit("read n1").await.unwrap();
        assert_eq!(read, Outcome::Output("node n1 {}".into()));
        session.submit("OBJECTS").await.unwrap();
        assert_eq!(recorder.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_local_only_mutations_stay_local() {
        let recorder = Arc::new(Recorder::default());
        let config = SessionConfig {
            local_only: vec!["set".into()],
            ..SessionConfig::default()
        };
        let session = Session::from_config(id("alice"), &config, recorder.clone());
        session.submit("SET n1 color red").await.unwrap();
        assert!(recorder.sent.lock().is_empty());
        assert!(!session.is_forwarded(&Command::Objects));
        assert!(session.is_forwarded(&Command::Node { id: "x".into() }));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let (session, recorder) = session("alice");
        let err = session.submit("FLY away").await.unwrap_err();
        assert!(err.is_user_error());
        assert!(recorder.sent.lock().is_empty());
    }

    #[test]
    fn test_receive_discards_echo() {
        let (session, _) = session("alice");
        assert_eq!(session.receive("[alice] 5 NODE n1"), Delivery::Echo);
        assert!(session.model().node("n1").is_none());

        assert_eq!(session.receive("[bob] 5 NODE n1"), Delivery::Applied);
        assert!(session.model().node("n1").is_some());
    }

    #[test]
    fn test_receive_stale_and_malformed() {
        let (session, _) = session("alice");
        session.receive("[bob] 10 SET n1 color red");
        assert_eq!(
            session.receive("[carol] 5 SET n1 color blue"),
            Delivery::Stale
        );
        assert_eq!(session.receive("no brackets"), Delivery::Malformed);
        assert_eq!(session.receive("[bob] NODE n1"), Delivery::Malformed);
        assert_eq!(session.receive("[bob] 5 OBJECTS"), Delivery::Malformed);
    }

    #[test]
    fn test_remote_timestamp_advances_clock() {
        let (session, _) = session("alice");
        let future = session.clock().now() + 60_000_000;
        session.receive(&format!("[bob] {future} NODE n1"));
        assert!(session.clock().now() > future);
    }

    #[tokio::test]
    async fn test_drop_right_after_node_takes_effect_when_clock_trails() {
        let (session, _) = session("alice");
        let future = session.clock().now() + 60_000_000;
        session.receive(&format!("[bob] {future} NODE other"));

        assert_eq!(session.submit("NODE n1").await.unwrap(), Outcome::Applied);
        assert_eq!(session.submit("DROP n1").await.unwrap(), Outcome::Applied);
        assert!(session.model().node("n1").is_none());
        assert_eq!(session.model().node_ids(), vec!["other".to_string()]);
    }

    #[tokio::test]
    async fn test_join_applies_snapshot() {
        let bus = LocalBus::new(id("hub"));
        let publisher = bus.publisher();
        publisher.publish("[bob] 1 NODE a".into()).await.unwrap();
        publisher.publish("[bob] 2 SET a color red".into()).await.unwrap();
        publisher.publish("garbage".into()).await.unwrap();

        let (session, _) = session("alice");
        let report = session.join(&mut bus.snapshot()).await;
        assert_eq!(
            report,
            JoinReport {
                applied: 2,
                stale: 0,
                malformed: 1,
                completed: true
            }
        );
        assert_eq!(session.model().render(), "node a {color: red}");
    }

    #[tokio::test]
    async fn test_join_without_request_is_incomplete() {
        struct Refusing;

        #[async_trait::async_trait]
        impl SnapshotSource for Refusing {
            async fn request(&mut self) -> Result<(), TransportError> {
                Err(TransportError::Closed)
            }
            async fn recv(&mut self) -> Result<String, TransportError> {
                Err(TransportError::Closed)
            }
        }

        let (session, _) = session("alice");
        let report = session.join(&mut Refusing).await;
        assert!(!report.completed);
        assert_eq!(report.applied, 0);
    }

    #[tokio::test]
    async fn test_run_live_until_closed() {
        let bus = LocalBus::new(id("hub"));
        let mut sub = bus.subscribe();
        let publisher = bus.publisher();
        publisher.publish("[bob] 1 NODE a".into()).await.unwrap();
        publisher.publish("[alice] 2 NODE b".into()).await.unwrap();
        publisher.publish("[bob] 0 SET a k v".into()).await.unwrap();
        bus.close();

        let (session, _) = session("alice");
        let report = session.run_live(&mut sub).await;
        assert_eq!(report.applied, 2);
        assert_eq!(report.echoes, 1);
        assert_eq!(session.model().node_ids(), vec!["a".to_string()]);
    }
}
