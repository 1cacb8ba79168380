//! Fingerprint sessions
//!
//! A session accepts operation requests from one caller, runs them one at a
//! time on the worker thread and relays driver notifications back to the
//! caller's callback.

mod cancellation;
mod dispatch;
mod manager;
mod notify;
mod state;

pub use cancellation::CancellationSignal;
pub use manager::{Session, SessionContext};
pub use state::SessionStateMachine;

/// Logical session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Idling = 0,
    Closed = 1,
    GeneratingChallenge = 2,
    RevokingChallenge = 3,
    Enrolling = 4,
    Authenticating = 5,
    DetectingInteraction = 6,
    EnumeratingEnrollments = 7,
    RemovingEnrollments = 8,
    GettingAuthenticatorId = 9,
    InvalidatingAuthenticatorId = 10,
    ResettingLockout = 11,
}

impl SessionState {
    /// Decode a value previously produced by `as u8`
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idling,
            1 => Self::Closed,
            2 => Self::GeneratingChallenge,
            3 => Self::RevokingChallenge,
            4 => Self::Enrolling,
            5 => Self::Authenticating,
            6 => Self::DetectingInteraction,
            7 => Self::EnumeratingEnrollments,
            8 => Self::RemovingEnrollments,
            9 => Self::GettingAuthenticatorId,
            10 => Self::InvalidatingAuthenticatorId,
            11 => Self::ResettingLockout,
            other => unreachable!("invalid session state {other}"),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idling => "IDLING",
            Self::Closed => "CLOSED",
            Self::GeneratingChallenge => "GENERATING_CHALLENGE",
            Self::RevokingChallenge => "REVOKING_CHALLENGE",
            Self::Enrolling => "ENROLLING",
            Self::Authenticating => "AUTHENTICATING",
            Self::DetectingInteraction => "DETECTING_INTERACTION",
            Self::EnumeratingEnrollments => "ENUMERATING_ENROLLMENTS",
            Self::RemovingEnrollments => "REMOVING_ENROLLMENTS",
            Self::GettingAuthenticatorId => "GETTING_AUTHENTICATOR_ID",
            Self::InvalidatingAuthenticatorId => "INVALIDATING_AUTHENTICATOR_ID",
            Self::ResettingLockout => "RESETTING_LOCKOUT",
        };
        f.write_str(name)
    }
}
