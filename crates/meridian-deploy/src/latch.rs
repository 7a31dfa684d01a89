//! One-shot broadcast completion latches.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::error::DeployError;

/// The outcome a latch publishes to its waiters.
pub(crate) type Outcome = Result<(), Arc<DeployError>>;

/// A one-shot broadcast latch: starts unset, transitions once to set, and is
/// never reset. Every waiter, whether it arrives before or after the
/// release, observes the same stored outcome. Releasing more than once is a
/// no-op; the first outcome wins.
#[derive(Debug)]
pub(crate) struct Latch {
    released: watch::Sender<bool>,
    outcome: Mutex<Option<Outcome>>,
}

impl Latch {
    pub fn new() -> Self {
        Self {
            released: watch::Sender::new(false),
            outcome: Mutex::new(None),
        }
    }

    /// Releases the latch, storing `outcome` for all current and future
    /// waiters. Idempotent.
    pub fn release(&self, outcome: Outcome) {
        {
            let mut slot = self.outcome.lock().expect("latch outcome lock poisoned");
            if slot.is_none() {
                *slot = Some(outcome);
            }
        }
        self.released.send_replace(true);
    }

    /// Waits until the latch is released and returns the stored outcome.
    pub async fn wait(&self) -> Outcome {
        let mut receiver = self.released.subscribe();
        // wait_for inspects the current value first, so a release that
        // happened before this call returns immediately.
        let _ = receiver.wait_for(|released| *released).await;
        self.outcome
            .lock()
            .expect("latch outcome lock poisoned")
            .clone()
            .unwrap_or(Ok(()))
    }
}
