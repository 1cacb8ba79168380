//! Consecutive failed-match accounting

use std::time::{Duration, Instant};

use fpd_core::{LockoutMode, LockoutTracker};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::LockoutConfig;

#[derive(Debug, Default)]
struct TrackerState {
    failed_attempts: u32,
    locked_until: Option<Instant>,
}

/// Threshold-based lockout policy
///
/// Every `timed_threshold` consecutive failures open a timed lockout window;
/// reaching `permanent_threshold` locks out until an explicit counter reset.
/// One tracker is shared by every session of a sensor.
#[derive(Debug)]
pub struct FailedAttemptTracker {
    config: LockoutConfig,
    state: Mutex<TrackerState>,
}

impl FailedAttemptTracker {
    pub fn new(config: LockoutConfig) -> Self {
        Self {
            config,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Consecutive failures since the last counter reset
    pub fn failed_attempts(&self) -> u32 {
        self.state.lock().failed_attempts
    }
}

impl Default for FailedAttemptTracker {
    fn default() -> Self {
        Self::new(LockoutConfig::default())
    }
}

impl LockoutTracker for FailedAttemptTracker {
    fn mode(&self) -> LockoutMode {
        let state = self.state.lock();
        if self.config.permanent_threshold > 0
            && state.failed_attempts >= self.config.permanent_threshold
        {
            return LockoutMode::Permanent;
        }
        match state.locked_until {
            Some(until) if until > Instant::now() => LockoutMode::Timed,
            _ => LockoutMode::None,
        }
    }

    fn lockout_time_left(&self) -> i64 {
        let state = self.state.lock();
        state
            .locked_until
            .map(|until| until.saturating_duration_since(Instant::now()).as_millis() as i64)
            .unwrap_or(0)
    }

    fn reset(&self, clear_counter: bool) {
        let mut state = self.state.lock();
        state.locked_until = None;
        if clear_counter {
            state.failed_attempts = 0;
        }
        debug!(clear_counter, "Lockout tracker reset");
    }

    fn add_failed_attempt(&self) {
        let mut state = self.state.lock();
        state.failed_attempts = state.failed_attempts.saturating_add(1);

        let failed = state.failed_attempts;
        let below_permanent =
            self.config.permanent_threshold == 0 || failed < self.config.permanent_threshold;
        if self.config.timed_threshold > 0
            && failed % self.config.timed_threshold == 0
            && below_permanent
        {
            let window = Duration::from_millis(self.config.timed_duration_ms);
            state.locked_until = Some(Instant::now() + window);
            info!(
                failed_attempts = failed,
                duration_ms = self.config.timed_duration_ms,
                "Timed lockout started"
            );
        } else {
            debug!(failed_attempts = failed, "Failed attempt recorded");
        }
    }
}
