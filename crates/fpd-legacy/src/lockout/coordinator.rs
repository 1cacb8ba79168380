//! Per-session lockout reporting and expiry timer

use std::sync::{Arc, Weak};
use std::time::Duration;

use fpd_core::{LockoutMode, LockoutTracker, SessionCallback};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct TimerState {
    started: bool,
    aborted: bool,
    /// Bumped on every start so a late firing of an older timer is ignored
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

/// Lockout glue between a session, its caller and the shared tracker
///
/// At most one expiry timer is live per coordinator. The timer runs on the
/// tokio runtime, never on the session worker, and only ever touches the
/// tracker and the caller callback.
pub struct LockoutCoordinator {
    tracker: Arc<dyn LockoutTracker>,
    callback: Arc<dyn SessionCallback>,
    runtime: Handle,
    timer: Mutex<TimerState>,
}

impl LockoutCoordinator {
    pub fn new(
        tracker: Arc<dyn LockoutTracker>,
        callback: Arc<dyn SessionCallback>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            tracker,
            callback,
            runtime,
            timer: Mutex::new(TimerState::default()),
        })
    }

    /// Report the current lockout to the caller
    ///
    /// Returns true when authentication is locked out.
    pub fn check_sensor_lockout(self: &Arc<Self>) -> bool {
        match self.tracker.mode() {
            LockoutMode::Permanent => {
                warn!("Fingerprint permanently locked out");
                self.callback.on_lockout_permanent();
                self.abort_timer();
                true
            }
            LockoutMode::Timed => {
                let time_left = self.tracker.lockout_time_left();
                info!(time_left, "Fingerprint locked out, timed");
                self.callback.on_lockout_timed(time_left);
                self.start_lockout_timer(time_left);
                true
            }
            LockoutMode::None => false,
        }
    }

    /// Record a rejected finger and report any resulting lockout
    pub fn on_failed_match(self: &Arc<Self>) -> bool {
        self.tracker.add_failed_attempt();
        self.check_sensor_lockout()
    }

    /// A finger matched: drop any pending expiry and fully reset the tracker
    ///
    /// The caller only hears about it when a lockout was actually in effect.
    pub fn on_successful_match(&self) {
        let was_locked = self.tracker.mode() != LockoutMode::None || self.timer_started();
        self.abort_timer();
        if was_locked {
            self.clear_lockout(true);
        } else {
            self.tracker.reset(true);
        }
    }

    /// Reset the tracker and tell the caller lockout is over
    ///
    /// `reset_counter` false keeps the failure counter and only closes the
    /// current lockout window.
    pub fn clear_lockout(&self, reset_counter: bool) {
        self.tracker.reset(reset_counter);
        self.callback.on_lockout_cleared();
    }

    /// Disable the running expiry timer, if any
    pub fn abort_timer(&self) {
        let mut timer = self.timer.lock();
        timer.aborted = true;
        timer.started = false;
        if let Some(handle) = timer.handle.take() {
            handle.abort();
            debug!("Lockout timer aborted");
        }
    }

    /// Whether an expiry timer is live
    pub fn timer_started(&self) -> bool {
        self.timer.lock().started
    }

    fn start_lockout_timer(self: &Arc<Self>, time_left_ms: i64) {
        let mut timer = self.timer.lock();
        if timer.started {
            return;
        }
        timer.started = true;
        timer.aborted = false;
        timer.generation = timer.generation.wrapping_add(1);

        let generation = timer.generation;
        let delay = Duration::from_millis(time_left_ms.max(0) as u64);
        let coordinator: Weak<Self> = Arc::downgrade(self);

        timer.handle = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.lockout_timer_expired(generation);
            }
        }));
        debug!(delay_ms = delay.as_millis() as u64, "Lockout timer started");
    }

    fn lockout_timer_expired(&self, generation: u64) {
        let fire = {
            let mut timer = self.timer.lock();
            if timer.generation != generation {
                return;
            }
            let fire = !timer.aborted;
            timer.started = false;
            timer.aborted = false;
            timer.handle = None;
            fire
        };

        if fire {
            info!("Lockout timer expired");
            self.clear_lockout(false);
        }
    }
}

impl Drop for LockoutCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockoutConfig;
    use crate::lockout::FailedAttemptTracker;
    use fpd_core::{ChannelCallback, SessionEvent};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn coordinator(
        tracker: Arc<FailedAttemptTracker>,
    ) -> (Arc<LockoutCoordinator>, UnboundedReceiver<SessionEvent>) {
        let (callback, rx) = ChannelCallback::new();
        let coordinator = LockoutCoordinator::new(tracker, Arc::new(callback), Handle::current());
        (coordinator, rx)
    }

    fn tracker(timed: u32, duration_ms: u64) -> Arc<FailedAttemptTracker> {
        Arc::new(FailedAttemptTracker::new(LockoutConfig {
            timed_threshold: timed,
            permanent_threshold: 20,
            timed_duration_ms: duration_ms,
        }))
    }

    #[tokio::test]
    async fn test_no_lockout_reports_nothing() {
        let (coordinator, mut rx) = coordinator(tracker(5, 100));
        assert!(!coordinator.on_failed_match());
        assert!(rx.try_recv().is_err());
        assert!(!coordinator.timer_started());
    }

    #[tokio::test]
    async fn test_timer_clears_lockout_on_expiry() {
        let tracker = tracker(1, 50);
        let (coordinator, mut rx) = coordinator(tracker.clone());

        assert!(coordinator.on_failed_match());
        match rx.recv().await.unwrap() {
            SessionEvent::LockoutTimed { duration_millis } => assert!(duration_millis > 0),
            other => panic!("Expected LockoutTimed, got {:?}", other),
        }
        assert!(coordinator.timer_started());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SessionEvent::LockoutCleared);
        assert!(!coordinator.timer_started());
        // Window closed, counter kept
        assert_eq!(tracker.mode(), LockoutMode::None);
        assert_eq!(tracker.failed_attempts(), 1);
    }

    #[tokio::test]
    async fn test_only_one_timer_per_lockout() {
        let (coordinator, mut rx) = coordinator(tracker(1, 80));
        assert!(coordinator.on_failed_match());
        assert!(coordinator.check_sensor_lockout());

        let mut cleared = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(400);
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if event == SessionEvent::LockoutCleared {
                cleared += 1;
            }
        }
        assert_eq!(cleared, 1);
    }

    #[tokio::test]
    async fn test_aborted_timer_never_fires() {
        let (coordinator, mut rx) = coordinator(tracker(1, 50));
        assert!(coordinator.on_failed_match());
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::LockoutTimed { .. }
        ));

        coordinator.abort_timer();
        assert!(!coordinator.timer_started());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_successful_match_resets_and_suppresses_timer() {
        let tracker = tracker(1, 50);
        let (coordinator, mut rx) = coordinator(tracker.clone());
        assert!(coordinator.on_failed_match());
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::LockoutTimed { .. }
        ));

        coordinator.on_successful_match();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LockoutCleared);
        assert_eq!(tracker.failed_attempts(), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_successful_match_without_lockout_is_quiet() {
        let tracker = tracker(5, 50);
        let (coordinator, mut rx) = coordinator(tracker.clone());
        assert!(!coordinator.on_failed_match());
        assert_eq!(tracker.failed_attempts(), 1);

        coordinator.on_successful_match();
        assert_eq!(tracker.failed_attempts(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_permanent_lockout() {
        let tracker = Arc::new(FailedAttemptTracker::new(LockoutConfig {
            timed_threshold: 0,
            permanent_threshold: 2,
            timed_duration_ms: 50,
        }));
        let (coordinator, mut rx) = coordinator(tracker);

        assert!(!coordinator.on_failed_match());
        assert!(coordinator.on_failed_match());
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LockoutPermanent);
        assert!(!coordinator.timer_started());
    }
}
