use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one stats invocation. Later runs get larger tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunToken(pub u64);

/// Monotonic run counter. Clones share the same counter.
#[derive(Clone, Debug, Default)]
pub struct RunGuard {
    counter: Arc<AtomicU64>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run, superseding every run started before it.
    pub fn begin(&self) -> RunToken {
        RunToken(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.counter.load(Ordering::SeqCst) == token.0
    }

    pub fn latest(&self) -> RunToken {
        RunToken(self.counter.load(Ordering::SeqCst))
    }

    pub fn activate(&self, token: RunToken) -> ActiveRun {
        ActiveRun {
            guard: self.clone(),
            token,
        }
    }
}

/// A run token bound to its guard, handed to workers so they can stop
/// fetching once a newer run has started.
#[derive(Clone, Debug)]
pub struct ActiveRun {
    guard: RunGuard,
    token: RunToken,
}

impl ActiveRun {
    pub fn token(&self) -> RunToken {
        self.token
    }

    pub fn is_superseded(&self) -> bool {
        !self.guard.is_current(self.token)
    }
}
