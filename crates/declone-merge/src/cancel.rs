use tokio::sync::watch;

/// Requests that a promotion run stop at the next batch boundary.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the driver between batches.
///
/// Cancellation is cooperative: a batch already in flight runs to completion.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A linked handle and signal.
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_handle, signal) = Self::new();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_uncancelled() {
        let (_handle, signal) = CancelSignal::new();
        assert!(!signal.is_cancelled());
        assert!(!CancelSignal::never().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let (handle, signal) = CancelSignal::new();
        let copy = signal.clone();
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(copy.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let (handle, mut signal) = CancelSignal::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            handle.cancel();
        });
        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("cancellation should be observed");
    }
}
