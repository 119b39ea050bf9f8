use std::sync::Arc;
use std::time::Duration;

use enostr::{Note, WebsocketTransport, WsTransport};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::liveness::{FetchObserver, Liveness, LivenessSnapshot};
use crate::request::FetchRequest;
use crate::session::{EndpointSession, SessionOutcome, Settlement, SESSION_TIMEOUT};
use crate::store::MergeStore;
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Per relay, counted from that relay's dispatch.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: SESSION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Distinct notes, unordered. See [`crate::classify`] for ordering.
    pub notes: Vec<Note>,
    pub liveness: LivenessSnapshot,
}

/// Runs one subscription per relay concurrently and merges the results.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn WsTransport>,
    options: FetchOptions,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Arc::new(WebsocketTransport))
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn WsTransport>) -> Self {
        Self {
            transport,
            options: FetchOptions::default(),
        }
    }

    pub fn options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch every note matching `request` from all of its relays.
    ///
    /// Only request validation can fail. Relays that error out or time out
    /// just contribute nothing and are counted as failed.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        observer: Arc<dyn FetchObserver>,
    ) -> Result<FetchOutcome> {
        let request = request.validate().inspect_err(|err| error!("{err}"))?;
        let filter = request.filter();

        let store = Arc::new(MergeStore::new());
        let liveness = Arc::new(Liveness::new(request.relays.len()));
        observer.on_liveness(liveness.snapshot());

        info!(
            "fetching notes for {} from {} relays",
            request.author,
            request.relays.len()
        );

        let mut settlements = Vec::with_capacity(request.relays.len());
        let mut sessions = JoinSet::new();

        for relay in request.relays {
            let settlement = Arc::new(Settlement::new(
                relay.clone(),
                liveness.clone(),
                observer.clone(),
            ));
            settlements.push(settlement.clone());

            let session = EndpointSession::new(
                relay,
                filter.clone(),
                store.clone(),
                settlement,
                observer.clone(),
            );
            let transport = self.transport.clone();
            let timeout = self.options.timeout;

            sessions.spawn(async move { session.run(transport.as_ref(), timeout).await });
        }

        // wait for all of them, whatever each one ends up doing
        while let Some(joined) = sessions.join_next().await {
            if let Err(err) = joined {
                error!("relay session task failed: {err}");
            }
        }

        // a session task that panicked never settled itself
        for settlement in &settlements {
            settlement.settle(&SessionOutcome::Error("session ended unexpectedly".to_owned()));
        }

        let liveness = liveness.snapshot();
        let notes = store.all();

        info!(
            "fetched {} notes, {}/{} relays answered",
            notes.len(),
            liveness.connected,
            liveness.total
        );

        Ok(FetchOutcome { notes, liveness })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::liveness::NoopObserver;
    use crate::test_utils::{author, test_note, RelayScript, ScriptedTransport};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        liveness: Mutex<Vec<LivenessSnapshot>>,
        seen: Mutex<Vec<usize>>,
    }

    impl FetchObserver for Recorder {
        fn on_liveness(&self, liveness: LivenessSnapshot) {
            self.liveness.lock().expect("lock").push(liveness);
        }

        fn on_messages(&self, seen: usize) {
            self.seen.lock().expect("lock").push(seen);
        }
    }

    fn request(relays: &[&str]) -> FetchRequest {
        FetchRequest::new(
            author().hex(),
            relays.iter().map(|r| (*r).to_owned()).collect(),
        )
    }

    fn ids(notes: &[Note]) -> Vec<u8> {
        notes.iter().map(|n| n.id.bytes()[0]).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn merges_relays_and_survives_a_silent_one() {
        let transport = ScriptedTransport::new()
            .relay(
                "wss://a.relay",
                RelayScript::eose(vec![test_note(1, 1, 100), test_note(2, 0, 200)]),
            )
            .relay(
                "wss://b.relay",
                RelayScript::eose(vec![test_note(1, 1, 100), test_note(3, 1, 150)]),
            )
            .relay("wss://c.relay", RelayScript::silent());

        let fetcher = Fetcher::new(Arc::new(transport));
        let recorder = Arc::new(Recorder::default());
        let outcome = fetcher
            .fetch(
                &request(&["wss://a.relay", "wss://b.relay", "wss://c.relay"]),
                recorder.clone(),
            )
            .await
            .expect("fetch");

        assert_eq!(outcome.notes.len(), 3);
        assert_eq!(
            outcome.liveness,
            LivenessSnapshot {
                connected: 2,
                failed: 1,
                total: 3
            }
        );

        let classified = classify(&outcome.notes);
        assert_eq!(ids(&classified.groups[&0]), vec![2]);
        assert_eq!(ids(&classified.groups[&1]), vec![3, 1]);
        assert_eq!(classified.stats.total, 3);
        assert_eq!(classified.stats.unique_kinds, 2);

        // initial report plus one per settlement
        let reports = recorder.liveness.lock().expect("lock").clone();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].settled(), 0);
        assert!(reports.last().expect("last").is_complete());

        let seen = recorder.seen.lock().expect("lock").clone();
        assert_eq!(seen.last(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_do_not_wait_on_each_other() {
        let transport = ScriptedTransport::new()
            .relay("wss://a.relay", RelayScript::silent())
            .relay("wss://b.relay", RelayScript::silent())
            .relay("wss://c.relay", RelayScript::silent_after(vec![test_note(4, 1, 1)]));

        let fetcher = Fetcher::new(Arc::new(transport));
        let start = Instant::now();
        let outcome = fetcher
            .fetch(
                &request(&["wss://a.relay", "wss://b.relay", "wss://c.relay"]),
                Arc::new(NoopObserver),
            )
            .await
            .expect("fetch");

        // three concurrent deadlines, not three back to back
        assert!(start.elapsed() < SESSION_TIMEOUT + Duration::from_secs(1));
        assert_eq!(outcome.liveness.failed, 3);
        assert_eq!(ids(&outcome.notes), vec![4]);
    }

    #[tokio::test]
    async fn every_relay_failing_is_still_a_successful_fetch() {
        let transport = ScriptedTransport::new()
            .relay("wss://a.relay", RelayScript::refuse("connection refused"))
            .relay("wss://b.relay", RelayScript::socket_error(vec![], "tls handshake"));

        let fetcher = Fetcher::new(Arc::new(transport));
        let outcome = fetcher
            .fetch(
                &request(&["wss://a.relay", "wss://b.relay"]),
                Arc::new(NoopObserver),
            )
            .await
            .expect("fetch");

        assert!(outcome.notes.is_empty());
        assert_eq!(
            outcome.liveness,
            LivenessSnapshot {
                connected: 0,
                failed: 2,
                total: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn huge_timeout_does_not_fail_a_healthy_relay() {
        let transport = ScriptedTransport::new().relay(
            "wss://a.relay",
            RelayScript::eose(vec![test_note(1, 1, 100)]),
        );
        let fetcher = Fetcher::new(Arc::new(transport)).options(FetchOptions {
            timeout: Duration::from_secs(u64::MAX),
        });

        let outcome = fetcher
            .fetch(&request(&["wss://a.relay"]), Arc::new(NoopObserver))
            .await
            .expect("fetch");

        assert_eq!(
            outcome.liveness,
            LivenessSnapshot {
                connected: 1,
                failed: 0,
                total: 1
            }
        );
        assert_eq!(ids(&outcome.notes), vec![1]);
    }

    struct PanickingTransport;

    impl WsTransport for PanickingTransport {
        fn connect(
            &self,
            url: &enostr::RelayUrl,
            _wakeup: enostr::Wakeup,
        ) -> enostr::Result<Box<dyn enostr::WsChannel>> {
            panic!("transport blew up connecting to {url}");
        }
    }

    #[tokio::test]
    async fn panicked_session_is_counted_as_failed() {
        let fetcher = Fetcher::new(Arc::new(PanickingTransport));
        let recorder = Arc::new(Recorder::default());

        let outcome = fetcher
            .fetch(&request(&["wss://a.relay"]), recorder.clone())
            .await
            .expect("fetch");

        assert!(outcome.notes.is_empty());
        assert_eq!(
            outcome.liveness,
            LivenessSnapshot {
                connected: 0,
                failed: 1,
                total: 1
            }
        );
        assert!(outcome.liveness.is_complete());
        // initial report plus the settlement made on the task's behalf
        assert_eq!(recorder.liveness.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn request_errors_happen_before_any_connection() {
        let transport = ScriptedTransport::new().relay("wss://a.relay", RelayScript::eose(vec![]));
        let fetcher = Fetcher::new(Arc::new(transport.clone()));

        let res = fetcher
            .fetch(
                &FetchRequest::new("", vec!["wss://a.relay".to_owned()]),
                Arc::new(NoopObserver),
            )
            .await;
        assert!(matches!(res, Err(Error::MissingAuthor)));

        let res = fetcher
            .fetch(&request(&["https://a.relay"]), Arc::new(NoopObserver))
            .await;
        assert!(matches!(res, Err(Error::NoRelays)));

        assert!(transport.sent("wss://a.relay").is_empty());
    }

    #[tokio::test]
    async fn kind_filter_reaches_the_relay() {
        let transport = ScriptedTransport::new().relay(
            "wss://a.relay",
            RelayScript::eose(vec![test_note(1, 1, 100), test_note(2, 7, 100)]),
        );
        let fetcher = Fetcher::new(Arc::new(transport.clone()));

        let outcome = fetcher
            .fetch(&request(&["wss://a.relay"]).kind(7), Arc::new(NoopObserver))
            .await
            .expect("fetch");

        // the relay ignored our filter, we did not
        assert_eq!(ids(&outcome.notes), vec![2]);
        let req = &transport.sent("wss://a.relay")[0];
        assert!(req.contains("\"kinds\":[7]"), "{req}");
    }
}
