//! Operation dispatch onto the worker thread
//!
//! Every operation follows the same shape: record the target state on the
//! caller's thread, then on the worker enter it, do the driver work and
//! return to IDLING whatever the outcome.

use std::sync::Arc;

use fpd_core::SensorError;
use tracing::{debug, warn};

use super::cancellation::CancellationSignal;
use super::manager::{Inner, Session};
use super::SessionState;

impl Session {
    /// Schedule `work` to run in `state`
    pub(super) fn dispatch<F>(&self, state: SessionState, op: &'static str, work: F)
    where
        F: FnOnce(&Inner) + Send + 'static,
    {
        if self.inner.state.is_closed() {
            warn!(session = %self.inner.id, op, "Session closed, request dropped");
            return;
        }

        self.inner.state.schedule_state_or_crash(state);
        let inner = Arc::clone(&self.inner);
        self.inner.worker.schedule(move || {
            inner.state.enter_state_or_crash(state);
            work(&inner);
            inner.state.enter_idling();
        });
    }

    /// Schedule cancellable `work` to run in `state`
    ///
    /// If the returned signal fires before the work starts, the caller gets
    /// CANCELED and `work` never runs.
    pub(super) fn dispatch_cancellable<F>(
        &self,
        state: SessionState,
        op: &'static str,
        work: F,
    ) -> CancellationSignal
    where
        F: FnOnce(&Inner) + Send + 'static,
    {
        let (signal, token) = CancellationSignal::pair();
        self.dispatch(state, op, move |inner| {
            if token.is_cancelled() {
                debug!(session = %inner.id, op, "Cancelled before start");
                inner.callback.on_error(SensorError::Canceled, 0);
                return;
            }
            work(inner);
        });
        signal
    }

    /// Schedule `work` without touching the session state
    pub(super) fn dispatch_stateless<F>(&self, op: &'static str, work: F)
    where
        F: FnOnce(&Inner) + Send + 'static,
    {
        if self.inner.state.is_closed() {
            warn!(session = %self.inner.id, op, "Session closed, request dropped");
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.inner.worker.schedule(move || work(&inner));
    }
}
