//! Run cancellation signal

use std::time::Duration;
use tokio::sync::watch;

/// Cloneable cancellation handle shared between the driver and whoever may
/// stop the run (Ctrl-C, a deadline, a test).
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: watch::Sender<bool>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Trigger cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation is triggered (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so wait_for cannot see a closed channel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Cancel automatically once `deadline` elapses.
    pub fn cancel_after(&self, deadline: Duration) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            log::warn!("Run deadline of {deadline:?} reached, cancelling");
            signal.cancel();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        signal.cancel();
        waiter.await.unwrap();
        assert!(signal.is_cancelled());

        // already cancelled: returns immediately
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fires_at_deadline() {
        let signal = CancelSignal::new();
        let _timer = signal.cancel_after(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!signal.is_cancelled());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(signal.is_cancelled());
    }
}
