//! Cooperative cancellation for running tests
//!
//! A test run polls the agent for minutes or hours; the owner of the run
//! (a CI step teardown, a signal handler) must be able to interrupt it at
//! a poll boundary without tearing the channel down. The pair below is a
//! thin wrapper over a `watch` channel: the handle flips the flag once,
//! every signal clone observes it.

use tokio::sync::watch;

/// Create a connected cancellation handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Owner side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    ///
    /// If the handle is dropped without cancelling, the run must keep
    /// going, so this future never resolves in that case.
    pub async fn cancelled(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        loop {
            if self.rx.changed().await.is_err() {
                // Handle dropped without a cancel request.
                std::future::pending::<()>().await;
            }
            if *self.rx.borrow() {
                return;
            }
        }
    }
}
