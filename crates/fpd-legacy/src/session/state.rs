//! Scheduled/current session state pair

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use tracing::trace;

use super::SessionState;

/// Session state shared between the caller-facing side and the worker
///
/// `scheduled` is the state submitted operations will enter; `current` is
/// the state actually entered once an operation runs. Several operations
/// may be pending at once only if they all schedule the same state. Mixing
/// states is a dispatcher bug and panics.
#[derive(Debug, Default)]
pub struct SessionStateMachine {
    current: AtomicU8,
    /// Pending state in the low byte, number of pending operations above it
    scheduled: AtomicU32,
}

fn pack(state: SessionState, pending: u32) -> u32 {
    (pending << 8) | state as u32
}

fn unpack(packed: u32) -> (SessionState, u32) {
    (SessionState::from_u8((packed & 0xff) as u8), packed >> 8)
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> SessionState {
        SessionState::from_u8(self.current.load(Ordering::SeqCst))
    }

    pub fn scheduled(&self) -> SessionState {
        unpack(self.scheduled.load(Ordering::SeqCst)).0
    }

    /// Operations scheduled but not yet entered
    pub fn pending(&self) -> u32 {
        unpack(self.scheduled.load(Ordering::SeqCst)).1
    }

    pub fn is_closed(&self) -> bool {
        self.current() == SessionState::Closed
    }

    /// Record the state the next operation will enter
    ///
    /// Panics if a different state is already scheduled.
    pub fn schedule_state_or_crash(&self, state: SessionState) {
        let result = self
            .scheduled
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |packed| {
                match unpack(packed) {
                    (_, 0) => Some(pack(state, 1)),
                    (pending, n) if pending == state => Some(pack(state, n + 1)),
                    _ => None,
                }
            });
        if let Err(packed) = result {
            let (pending, _) = unpack(packed);
            panic!("attempt to schedule {state} while {pending} is still scheduled");
        }
        trace!(%state, "State scheduled");
    }

    /// Enter a previously scheduled state
    ///
    /// Panics if `state` is not the scheduled one. The scheduled state
    /// returns to IDLING once every pending operation has entered. A closed
    /// session stays closed.
    pub fn enter_state_or_crash(&self, state: SessionState) {
        let result = self
            .scheduled
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |packed| {
                match unpack(packed) {
                    (pending, 1) if pending == state => Some(pack(SessionState::Idling, 0)),
                    (pending, n) if pending == state && n > 1 => Some(pack(state, n - 1)),
                    _ => None,
                }
            });
        if let Err(packed) = result {
            let (scheduled, _) = unpack(packed);
            panic!("attempt to enter {state} while {scheduled} is scheduled");
        }
        self.enter(state);
    }

    /// Return to IDLING unless the session is closed
    pub fn enter_idling(&self) {
        self.enter(SessionState::Idling);
    }

    /// Enter CLOSED; returns false if already closed
    pub fn close(&self) -> bool {
        self.current
            .swap(SessionState::Closed as u8, Ordering::SeqCst)
            != SessionState::Closed as u8
    }

    fn enter(&self, state: SessionState) {
        let _ = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != SessionState::Closed as u8).then_some(state as u8)
            });
        trace!(%state, "State entered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_then_enter() {
        let sm = SessionStateMachine::new();
        sm.schedule_state_or_crash(SessionState::Enrolling);
        assert_eq!(sm.scheduled(), SessionState::Enrolling);
        assert_eq!(sm.current(), SessionState::Idling);

        sm.enter_state_or_crash(SessionState::Enrolling);
        assert_eq!(sm.current(), SessionState::Enrolling);
        assert_eq!(sm.scheduled(), SessionState::Idling);

        sm.enter_idling();
        assert_eq!(sm.current(), SessionState::Idling);
    }

    #[test]
    fn test_same_state_scheduled_twice_enters_twice() {
        let sm = SessionStateMachine::new();
        sm.schedule_state_or_crash(SessionState::Authenticating);
        sm.schedule_state_or_crash(SessionState::Authenticating);
        assert_eq!(sm.scheduled(), SessionState::Authenticating);
        assert_eq!(sm.pending(), 2);

        sm.enter_state_or_crash(SessionState::Authenticating);
        assert_eq!(sm.scheduled(), SessionState::Authenticating);
        assert_eq!(sm.pending(), 1);
        sm.enter_idling();

        sm.enter_state_or_crash(SessionState::Authenticating);
        assert_eq!(sm.current(), SessionState::Authenticating);
        assert_eq!(sm.scheduled(), SessionState::Idling);
        assert_eq!(sm.pending(), 0);

        // Back at IDLING any state may be scheduled again
        sm.enter_idling();
        sm.schedule_state_or_crash(SessionState::Enrolling);
        assert_eq!(sm.scheduled(), SessionState::Enrolling);
    }

    #[test]
    #[should_panic(expected = "attempt to enter")]
    fn test_enter_without_schedule_panics() {
        let sm = SessionStateMachine::new();
        sm.schedule_state_or_crash(SessionState::GettingAuthenticatorId);
        sm.enter_state_or_crash(SessionState::GettingAuthenticatorId);
        sm.enter_state_or_crash(SessionState::GettingAuthenticatorId);
    }

    #[test]
    #[should_panic(expected = "still scheduled")]
    fn test_double_schedule_panics() {
        let sm = SessionStateMachine::new();
        sm.schedule_state_or_crash(SessionState::Enrolling);
        sm.schedule_state_or_crash(SessionState::Authenticating);
    }

    #[test]
    #[should_panic(expected = "attempt to enter")]
    fn test_enter_unscheduled_state_panics() {
        let sm = SessionStateMachine::new();
        sm.schedule_state_or_crash(SessionState::Enrolling);
        sm.enter_state_or_crash(SessionState::Authenticating);
    }

    #[test]
    fn test_closed_is_sticky() {
        let sm = SessionStateMachine::new();
        assert!(sm.close());
        assert!(!sm.close());

        sm.enter_idling();
        assert_eq!(sm.current(), SessionState::Closed);

        // Work queued before close still runs its enter/exit pair
        sm.schedule_state_or_crash(SessionState::EnumeratingEnrollments);
        sm.enter_state_or_crash(SessionState::EnumeratingEnrollments);
        assert_eq!(sm.current(), SessionState::Closed);
        assert_eq!(sm.scheduled(), SessionState::Idling);
        sm.enter_idling();
        assert!(sm.is_closed());
    }
}
