use std::future::pending;
use std::sync::Arc;

use tokio::sync::watch;

/// Creates a connected pair of canceller and signal.
pub fn cancellation() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx: Arc::new(tx) }, CancelSignal { rx: Some(rx) })
}

/// Cancels every run holding one of its signals.
#[derive(Clone, Debug)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    /// Requests cancellation. Runs stop at their next suspension point.
    #[inline]
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// The receiving side of a [`Canceller`].
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// Returns a signal that never fires.
    #[inline]
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Returns whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Completes once cancellation is requested. Pends forever if the
    /// canceller is dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            pending::<()>().await;
        }
    }
}
