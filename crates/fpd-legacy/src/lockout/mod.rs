//! Lockout handling
//!
//! - `FailedAttemptTracker`: counts consecutive failed matches and decides
//!   the lockout mode
//! - `LockoutCoordinator`: per-session glue that reports lockout to the
//!   caller and owns the expiry timer

mod coordinator;
mod tracker;

pub use coordinator::LockoutCoordinator;
pub use tracker::FailedAttemptTracker;
