//! One subscription against one relay.
//!
//! A session connects, sends its REQ once the socket opens, forwards every
//! note it receives to the shared [`MergeStore`] and settles exactly once:
//!
//! - `Complete` when the relay sends EOSE for our subscription
//! - `Error` on a transport error, a closed socket or a CLOSED frame
//! - `Timeout` when the deadline passes first
//!
//! Failures never propagate as `Err`. The fetcher waits on every session
//! and only looks at the liveness counts.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use enostr::ewebsock::{WsEvent, WsMessage};
use enostr::{Filter, Note, RelayMessage, RelayUrl, SubId, WsChannel, WsTransport};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::liveness::{FetchObserver, Liveness};
use crate::store::MergeStore;

pub const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Complete,
    Timeout,
    Error(String),
}

impl SessionOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SessionOutcome::Complete)
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Complete => write!(f, "complete"),
            SessionOutcome::Timeout => write!(f, "timed out"),
            SessionOutcome::Error(err) => write!(f, "error: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Connected,
    Streaming,
    Settled(SessionOutcome),
}

/// Settle-once guard for a session.
///
/// Shared by the session task and the fetcher. Whoever settles first reports
/// to the liveness counters, every later call is a no-op.
pub struct Settlement {
    relay: RelayUrl,
    settled: AtomicBool,
    liveness: Arc<Liveness>,
    observer: Arc<dyn FetchObserver>,
}

impl Settlement {
    pub fn new(relay: RelayUrl, liveness: Arc<Liveness>, observer: Arc<dyn FetchObserver>) -> Self {
        Self {
            relay,
            settled: AtomicBool::new(false),
            liveness,
            observer,
        }
    }

    /// Returns false if the session had already settled.
    pub fn settle(&self, outcome: &SessionOutcome) -> bool {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("{} already settled, ignoring {}", self.relay, outcome);
            return false;
        }

        match outcome {
            SessionOutcome::Complete => info!("{} complete", self.relay),
            SessionOutcome::Timeout => warn!("{} timed out", self.relay),
            SessionOutcome::Error(err) => warn!("{} failed: {}", self.relay, err),
        }

        let snapshot = self.liveness.record(outcome);
        self.observer.on_liveness(snapshot);
        true
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

pub struct EndpointSession {
    relay: RelayUrl,
    filter: Filter,
    subid: SubId,
    state: SessionState,
    store: Arc<MergeStore>,
    settlement: Arc<Settlement>,
    observer: Arc<dyn FetchObserver>,
}

impl EndpointSession {
    pub fn new(
        relay: RelayUrl,
        filter: Filter,
        store: Arc<MergeStore>,
        settlement: Arc<Settlement>,
        observer: Arc<dyn FetchObserver>,
    ) -> Self {
        Self {
            relay,
            filter,
            subid: SubId::new("fetch"),
            state: SessionState::Pending,
            store,
            settlement,
            observer,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs the session to settlement. The deadline starts now, not when the
    /// socket opens. A timeout too large to represent means no deadline.
    pub async fn run(mut self, transport: &dyn WsTransport, timeout: Duration) -> SessionOutcome {
        let deadline = Instant::now().checked_add(timeout);
        let notify = Arc::new(Notify::new());
        let wake = notify.clone();

        let mut channel = match transport.connect(&self.relay, Box::new(move || wake.notify_one()))
        {
            Ok(channel) => channel,
            Err(err) => return self.settle(SessionOutcome::Error(err.to_string())),
        };

        let pump = self.pump(channel.as_mut(), &notify);
        let pumped = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, pump).await,
            None => Ok(pump.await),
        };
        let outcome = match pumped {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!("{} deadline hit while {:?}", self.relay, self.state);
                SessionOutcome::Timeout
            }
        };

        if self.state == SessionState::Streaming && !outcome.is_complete() {
            channel.unsubscribe(self.subid.as_str().to_owned());
        }
        channel.close();

        self.settle(outcome)
    }

    fn settle(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.settlement.settle(&outcome);
        self.state = SessionState::Settled(outcome.clone());
        outcome
    }

    async fn pump(&mut self, channel: &mut dyn WsChannel, notify: &Notify) -> SessionOutcome {
        loop {
            while let Some(event) = channel.try_recv() {
                if let Some(outcome) = self.handle(channel, event) {
                    return outcome;
                }
            }

            // a wakeup that fired while we were draining leaves a permit
            notify.notified().await;
        }
    }

    fn handle(&mut self, channel: &mut dyn WsChannel, event: WsEvent) -> Option<SessionOutcome> {
        match event {
            WsEvent::Opened => {
                self.state = SessionState::Connected;
                channel.subscribe(self.subid.as_str().to_owned(), vec![self.filter.clone()]);
                self.state = SessionState::Streaming;
                None
            }
            WsEvent::Closed => Some(SessionOutcome::Error(
                "connection closed before end of stored events".to_owned(),
            )),
            WsEvent::Error(err) => Some(SessionOutcome::Error(err)),
            WsEvent::Message(WsMessage::Text(text)) => self.handle_text(&text),
            WsEvent::Message(_) => None,
        }
    }

    fn handle_text(&mut self, text: &str) -> Option<SessionOutcome> {
        let msg = match RelayMessage::from_json(text) {
            Ok(msg) => msg,
            Err(err) => {
                warn!("{}: skipping unparseable frame: {}", self.relay, err);
                return None;
            }
        };

        match msg {
            RelayMessage::Event(subid, frame) if self.subid.matches(subid) => {
                self.ingest(frame);
                None
            }
            RelayMessage::Eose(subid) if self.subid.matches(subid) => {
                Some(SessionOutcome::Complete)
            }
            RelayMessage::Closed(subid, reason) if self.subid.matches(subid) => Some(
                SessionOutcome::Error(format!("subscription closed by relay: {reason}")),
            ),
            RelayMessage::Notice(notice) => {
                info!("{} notice: {}", self.relay, notice);
                None
            }
            other => {
                debug!("{}: ignoring {:?}", self.relay, other);
                None
            }
        }
    }

    fn ingest(&mut self, frame: &str) {
        let note = match Note::from_relay_event(frame) {
            Ok(note) => note,
            Err(err) => {
                warn!("{}: dropping malformed event: {}", self.relay, err);
                return;
            }
        };

        if !self.filter.matches(&note) {
            debug!("{}: dropping {} outside of our filter", self.relay, note.id);
            return;
        }

        if let Some(seen) = self.store.insert(note) {
            self.observer.on_messages(seen);
        }
    }
}
