//! One-shot store readiness.

use std::time::Duration;

use tokio::sync::watch;

use super::{StoreError, StoreResult};

/// Create a linked signal/readiness pair. The store is not ready until
/// [`ReadySignal::resolve`] is called.
pub fn readiness() -> (ReadySignal, Readiness) {
    let (tx, rx) = watch::channel(false);
    (ReadySignal { tx }, Readiness { rx })
}

/// Resolving half, held by whoever initializes the store.
///
/// Dropping it without resolving marks the store unavailable.
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    pub fn resolve(self) {
        self.tx.send_replace(true);
        tracing::debug!("Document store ready");
    }
}

/// Waiting half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Readiness {
    rx: watch::Receiver<bool>,
}

impl Readiness {
    /// An already resolved readiness, for stores that need no initialization.
    pub fn ready() -> Self {
        let (signal, readiness) = readiness();
        signal.resolve();
        readiness
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the store is ready, at most `timeout`.
    pub async fn wait(&self, timeout: Duration) -> StoreResult<()> {
        let mut rx = self.rx.clone();
        let result = tokio::time::timeout(timeout, rx.wait_for(|ready| *ready))
            .await
            .map(|waited| waited.map(|_| ()));
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(StoreError::Unavailable),
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Document store not ready");
                Err(StoreError::InitializationTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_resolves_immediately() {
        let readiness = Readiness::ready();
        assert!(readiness.is_ready());
        assert!(readiness.wait(Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let (_signal, readiness) = readiness();
        let result = readiness.wait(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StoreError::InitializationTimeout(_))));
    }

    #[tokio::test]
    async fn test_dropped_signal_is_unavailable() {
        let (signal, readiness) = readiness();
        drop(signal);
        let result = readiness.wait(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(StoreError::Unavailable)));
    }

    #[tokio::test]
    async fn test_resolve_wakes_waiter() {
        let (signal, readiness) = readiness();
        let waiter = tokio::spawn({
            let readiness = readiness.clone();
            async move { readiness.wait(Duration::from_secs(5)).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.resolve();

        assert!(waiter.await.unwrap().is_ok());
        assert!(readiness.is_ready());
    }
}
