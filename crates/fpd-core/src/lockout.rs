//! Consecutive-failure accounting contract

use serde::{Deserialize, Serialize};

/// Lockout state reported by a `LockoutTracker`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockoutMode {
    #[default]
    None,
    /// Authentication suspended until a time window elapses
    Timed,
    /// Authentication suspended until an explicit reset
    Permanent,
}

/// Failure-accounting policy consulted by the session's lockout handling
///
/// Implementations own thresholds and backoff; sessions only ask for the
/// current mode and feed outcomes back.
pub trait LockoutTracker: Send + Sync {
    /// Current lockout mode
    fn mode(&self) -> LockoutMode;

    /// Remaining TIMED lockout in milliseconds (0 when not timed out)
    fn lockout_time_left(&self) -> i64;

    /// Clear the lockout window, and the failure counter too when
    /// `clear_counter` is set
    fn reset(&self, clear_counter: bool);

    /// Record one failed match
    fn add_failed_attempt(&self);
}
