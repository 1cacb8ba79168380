//! One-shot cancellation handshake

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Caller-side handle of a cancellable operation
///
/// Cancelling only takes effect if it lands before the scheduled work
/// starts; once the driver call is running use `Session::cancel`.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// Worker-side half, polled once when the work starts
#[derive(Debug)]
pub(crate) struct CancellationToken {
    rx: oneshot::Receiver<()>,
}

impl CancellationSignal {
    pub(crate) fn pair() -> (Self, CancellationToken) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            CancellationToken { rx },
        )
    }

    /// Request cancellation; later calls are no-ops
    pub fn cancel(&self) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl CancellationToken {
    /// Consume the token; true if cancellation was requested
    pub(crate) fn is_cancelled(mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_before_poll() {
        let (signal, token) = CancellationSignal::pair();
        signal.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_not_cancelled() {
        let (_signal, token) = CancellationSignal::pair();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_dropped_signal_is_not_cancellation() {
        let (signal, token) = CancellationSignal::pair();
        drop(signal);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_after_poll_is_harmless() {
        let (signal, token) = CancellationSignal::pair();
        let clone = signal.clone();
        assert!(!token.is_cancelled());
        signal.cancel();
        clone.cancel();
    }
}
