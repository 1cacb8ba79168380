//! Caller callback contract
//!
//! Every outcome of a session operation reaches the caller through one of
//! these one-way notifications. Implementations must not block: they are
//! invoked from the session worker, the driver notification listener and the
//! lockout timer.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{AcquiredInfo, HardwareAuthToken, SensorError};

/// Result sink for one session
pub trait SessionCallback: Send + Sync {
    fn on_challenge_generated(&self, challenge: i64);

    fn on_challenge_revoked(&self, challenge: i64);

    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32);

    fn on_error(&self, error: SensorError, vendor_code: i32);

    fn on_enrollment_progress(&self, enrollment_id: i32, remaining: i32);

    fn on_authentication_succeeded(&self, enrollment_id: i32, hat: HardwareAuthToken);

    fn on_authentication_failed(&self);

    fn on_interaction_detected(&self);

    fn on_enrollments_enumerated(&self, enrollment_ids: Vec<i32>);

    fn on_enrollments_removed(&self, enrollment_ids: Vec<i32>);

    fn on_authenticator_id_retrieved(&self, authenticator_id: i64);

    fn on_authenticator_id_invalidated(&self, new_authenticator_id: i64);

    /// Authentication is suspended for `duration_millis`
    fn on_lockout_timed(&self, duration_millis: i64);

    fn on_lockout_permanent(&self);

    fn on_lockout_cleared(&self);

    fn on_session_closed(&self);
}

/// One callback invocation, as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ChallengeGenerated { challenge: i64 },
    ChallengeRevoked { challenge: i64 },
    Acquired { info: AcquiredInfo, vendor_code: i32 },
    Error { error: SensorError, vendor_code: i32 },
    EnrollmentProgress { enrollment_id: i32, remaining: i32 },
    AuthenticationSucceeded { enrollment_id: i32, hat: HardwareAuthToken },
    AuthenticationFailed,
    InteractionDetected,
    EnrollmentsEnumerated { enrollment_ids: Vec<i32> },
    EnrollmentsRemoved { enrollment_ids: Vec<i32> },
    AuthenticatorIdRetrieved { authenticator_id: i64 },
    AuthenticatorIdInvalidated { new_authenticator_id: i64 },
    LockoutTimed { duration_millis: i64 },
    LockoutPermanent,
    LockoutCleared,
    SessionClosed,
}

/// Callback that turns every notification into a `SessionEvent` on a channel
///
/// Sending never blocks, so it is safe from any thread. Events sent after the
/// receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelCallback {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelCallback {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }
}

impl SessionCallback for ChannelCallback {
    fn on_challenge_generated(&self, challenge: i64) {
        self.emit(SessionEvent::ChallengeGenerated { challenge });
    }

    fn on_challenge_revoked(&self, challenge: i64) {
        self.emit(SessionEvent::ChallengeRevoked { challenge });
    }

    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32) {
        self.emit(SessionEvent::Acquired { info, vendor_code });
    }

    fn on_error(&self, error: SensorError, vendor_code: i32) {
        self.emit(SessionEvent::Error { error, vendor_code });
    }

    fn on_enrollment_progress(&self, enrollment_id: i32, remaining: i32) {
        self.emit(SessionEvent::EnrollmentProgress {
            enrollment_id,
            remaining,
        });
    }

    fn on_authentication_succeeded(&self, enrollment_id: i32, hat: HardwareAuthToken) {
        self.emit(SessionEvent::AuthenticationSucceeded { enrollment_id, hat });
    }

    fn on_authentication_failed(&self) {
        self.emit(SessionEvent::AuthenticationFailed);
    }

    fn on_interaction_detected(&self) {
        self.emit(SessionEvent::InteractionDetected);
    }

    fn on_enrollments_enumerated(&self, enrollment_ids: Vec<i32>) {
        self.emit(SessionEvent::EnrollmentsEnumerated { enrollment_ids });
    }

    fn on_enrollments_removed(&self, enrollment_ids: Vec<i32>) {
        self.emit(SessionEvent::EnrollmentsRemoved { enrollment_ids });
    }

    fn on_authenticator_id_retrieved(&self, authenticator_id: i64) {
        self.emit(SessionEvent::AuthenticatorIdRetrieved { authenticator_id });
    }

    fn on_authenticator_id_invalidated(&self, new_authenticator_id: i64) {
        self.emit(SessionEvent::AuthenticatorIdInvalidated {
            new_authenticator_id,
        });
    }

    fn on_lockout_timed(&self, duration_millis: i64) {
        self.emit(SessionEvent::LockoutTimed { duration_millis });
    }

    fn on_lockout_permanent(&self) {
        self.emit(SessionEvent::LockoutPermanent);
    }

    fn on_lockout_cleared(&self) {
        self.emit(SessionEvent::LockoutCleared);
    }

    fn on_session_closed(&self) {
        self.emit(SessionEvent::SessionClosed);
    }
}
