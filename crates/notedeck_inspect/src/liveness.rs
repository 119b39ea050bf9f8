use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::session::SessionOutcome;

/// Connected/failed counts for one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LivenessSnapshot {
    pub connected: usize,
    pub failed: usize,
    pub total: usize,
}

impl LivenessSnapshot {
    pub fn settled(&self) -> usize {
        self.connected + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.settled() == self.total
    }
}

/// Shared between every session of a fetch. Each session settlement bumps
/// exactly one of the counters.
#[derive(Debug)]
pub struct Liveness {
    connected: AtomicUsize,
    failed: AtomicUsize,
    total: usize,
}

impl Liveness {
    pub fn new(total: usize) -> Self {
        Self {
            connected: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total,
        }
    }

    pub fn record(&self, outcome: &SessionOutcome) -> LivenessSnapshot {
        if outcome.is_complete() {
            self.connected.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> LivenessSnapshot {
        LivenessSnapshot {
            connected: self.connected.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            total: self.total,
        }
    }
}

/// Progress hooks for the presentation layer. Called from session tasks,
/// so implementations must be cheap and thread safe.
pub trait FetchObserver: Send + Sync {
    fn on_liveness(&self, _liveness: LivenessSnapshot) {}

    /// Number of distinct notes seen so far.
    fn on_messages(&self, _seen: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}
