//! Session aggregate and its public operation surface

use std::future::Future;
use std::sync::Arc;

use fpd_core::{
    HardwareAuthToken, LockoutTracker, OperationContext, PointerContext, SensorError,
    SessionCallback,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::cancellation::CancellationSignal;
use super::state::SessionStateMachine;
use super::SessionState;
use crate::config::SessionConfig;
use crate::device::{DeviceError, FingerprintDevice};
use crate::lockout::LockoutCoordinator;
use crate::token::LegacyAuthToken;
use crate::vendor::VendorCodes;
use crate::worker::WorkerThread;

/// Collaborators a session is built on
#[derive(Clone)]
pub struct SessionContext {
    pub device: Arc<dyn FingerprintDevice>,
    /// Failure accounting, shared by all sessions of a sensor
    pub lockout_tracker: Arc<dyn LockoutTracker>,
    /// Sequential executor for driver calls
    pub worker: Arc<WorkerThread>,
    /// Runtime for the lockout timer and death link
    pub runtime: Handle,
    pub config: SessionConfig,
    pub codes: VendorCodes,
}

pub(crate) struct Inner {
    pub(super) id: Uuid,
    pub(super) user_id: i32,
    pub(super) device: Arc<dyn FingerprintDevice>,
    pub(super) worker: Arc<WorkerThread>,
    pub(super) runtime: Handle,
    pub(super) config: SessionConfig,
    pub(super) codes: VendorCodes,
    pub(super) callback: Arc<dyn SessionCallback>,
    pub(super) state: SessionStateMachine,
    pub(super) lockout: Arc<LockoutCoordinator>,
    /// Template ids collected across enumeration notifications
    pub(super) enumerated: Mutex<Vec<i32>>,
    death_link: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// Log a driver failure and report it to the caller
    pub(super) fn report_device_error(&self, op: &'static str, err: DeviceError) {
        error!(session = %self.id, op, code = err.code(), "Device call failed: {}", err);
        self.callback.on_error(SensorError::UnableToProcess, 0);
    }

    fn gid(&self) -> u32 {
        self.user_id as u32
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.death_link.get_mut().take() {
            handle.abort();
        }
    }
}

/// One caller's session with the sensor
///
/// Operation methods return immediately; outcomes arrive on the session
/// callback. Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
    pub(super) inner: Arc<Inner>,
}

impl Session {
    /// Create a session for `user_id` and select its template group
    ///
    /// Group selection is queued on the worker ahead of any operation of
    /// this session. Panics if `user_id` is negative.
    pub fn new(ctx: SessionContext, user_id: i32, callback: Arc<dyn SessionCallback>) -> Self {
        assert!(user_id >= 0, "invalid user id {user_id}");

        let id = Uuid::new_v4();
        let lockout = LockoutCoordinator::new(
            ctx.lockout_tracker,
            Arc::clone(&callback),
            ctx.runtime.clone(),
        );

        info!(session = %id, user_id, "Session created");
        let session = Self {
            inner: Arc::new(Inner {
                id,
                user_id,
                device: ctx.device,
                worker: ctx.worker,
                runtime: ctx.runtime,
                config: ctx.config,
                codes: ctx.codes,
                callback,
                state: SessionStateMachine::new(),
                lockout,
                enumerated: Mutex::new(Vec::new()),
                death_link: Mutex::new(None),
            }),
        };

        let inner = Arc::clone(&session.inner);
        session.inner.worker.schedule(move || {
            let template_path = inner.config.template_path_for(inner.user_id);
            if let Err(e) = inner.device.set_active_group(inner.gid(), &template_path) {
                error!(
                    session = %inner.id,
                    user_id = inner.user_id,
                    path = %template_path.display(),
                    code = e.code(),
                    "Failed to select template group"
                );
            }
        });
        session
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn user_id(&self) -> i32 {
        self.inner.user_id
    }

    pub fn current_state(&self) -> SessionState {
        self.inner.state.current()
    }

    pub fn scheduled_state(&self) -> SessionState {
        self.inner.state.scheduled()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.is_closed()
    }

    /// Whether both handles refer to the same session
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Challenge
    // =========================================================================

    pub fn generate_challenge(&self) {
        info!(session = %self.inner.id, "generateChallenge");
        self.dispatch(
            SessionState::GeneratingChallenge,
            "generate_challenge",
            |inner| {
                let challenge = inner.device.pre_enroll();
                inner.callback.on_challenge_generated(challenge as i64);
            },
        );
    }

    pub fn revoke_challenge(&self, challenge: i64) {
        info!(session = %self.inner.id, challenge, "revokeChallenge");
        self.dispatch(
            SessionState::RevokingChallenge,
            "revoke_challenge",
            move |inner| match inner.device.post_enroll() {
                Ok(()) => inner.callback.on_challenge_revoked(challenge),
                Err(e) => inner.report_device_error("revoke_challenge", e),
            },
        );
    }

    // =========================================================================
    // Enroll / Authenticate / Detect
    // =========================================================================

    pub fn enroll(&self, hat: &HardwareAuthToken) -> CancellationSignal {
        info!(session = %self.inner.id, "enroll");
        let token = LegacyAuthToken::from_hardware(hat);
        self.dispatch_cancellable(SessionState::Enrolling, "enroll", move |inner| {
            let timeout = inner.config.enroll_timeout_secs;
            if let Err(e) = inner.device.enroll(&token, inner.gid(), timeout) {
                inner.report_device_error("enroll", e);
            }
        })
    }

    pub fn authenticate(&self, operation_id: i64) -> CancellationSignal {
        info!(session = %self.inner.id, operation_id, "authenticate");
        self.dispatch_cancellable(
            SessionState::Authenticating,
            "authenticate",
            move |inner| {
                if let Err(e) = inner.device.authenticate(operation_id as u64, inner.gid()) {
                    inner.report_device_error("authenticate", e);
                }
            },
        )
    }

    /// The legacy driver has no detect-only mode, so this always reports
    /// UNABLE_TO_PROCESS unless cancelled first
    pub fn detect_interaction(&self) -> CancellationSignal {
        info!(session = %self.inner.id, "detectInteraction");
        self.dispatch_cancellable(
            SessionState::DetectingInteraction,
            "detect_interaction",
            |inner| {
                debug!(session = %inner.id, "Detect interaction is not supported");
                inner.callback.on_error(SensorError::UnableToProcess, 0);
            },
        )
    }

    pub fn enroll_with_context(
        &self,
        hat: &HardwareAuthToken,
        context: &OperationContext,
    ) -> CancellationSignal {
        debug!(session = %self.inner.id, ?context, "enrollWithContext");
        self.enroll(hat)
    }

    pub fn authenticate_with_context(
        &self,
        operation_id: i64,
        context: &OperationContext,
    ) -> CancellationSignal {
        debug!(session = %self.inner.id, ?context, "authenticateWithContext");
        self.authenticate(operation_id)
    }

    pub fn detect_interaction_with_context(
        &self,
        context: &OperationContext,
    ) -> CancellationSignal {
        debug!(session = %self.inner.id, ?context, "detectInteractionWithContext");
        self.detect_interaction()
    }

    // =========================================================================
    // Enrollments
    // =========================================================================

    /// Report all enrolled template ids in one callback
    pub fn enumerate_enrollments(&self) {
        info!(session = %self.inner.id, "enumerateEnrollments");
        self.dispatch(
            SessionState::EnumeratingEnrollments,
            "enumerate_enrollments",
            |inner| {
                inner.enumerated.lock().clear();
                if let Err(e) = inner.device.enumerate() {
                    inner.report_device_error("enumerate_enrollments", e);
                }
            },
        );
    }

    /// Remove templates one by one; a failing id does not stop the rest
    pub fn remove_enrollments(&self, enrollment_ids: Vec<i32>) {
        info!(
            session = %self.inner.id,
            count = enrollment_ids.len(),
            "removeEnrollments"
        );
        self.dispatch(
            SessionState::RemovingEnrollments,
            "remove_enrollments",
            move |inner| {
                for enrollment_id in enrollment_ids {
                    let Ok(fid) = u32::try_from(enrollment_id) else {
                        error!(session = %inner.id, enrollment_id, "Invalid enrollment id");
                        continue;
                    };
                    if let Err(e) = inner.device.remove(inner.gid(), fid) {
                        error!(
                            session = %inner.id,
                            enrollment_id,
                            code = e.code(),
                            "Remove failed"
                        );
                    }
                }
            },
        );
    }

    // =========================================================================
    // Authenticator ID
    // =========================================================================

    pub fn get_authenticator_id(&self) {
        info!(session = %self.inner.id, "getAuthenticatorId");
        self.dispatch(
            SessionState::GettingAuthenticatorId,
            "get_authenticator_id",
            |inner| {
                let authenticator_id = inner.device.get_authenticator_id();
                info!(session = %inner.id, authenticator_id, "Authenticator id retrieved");
                inner
                    .callback
                    .on_authenticator_id_retrieved(authenticator_id as i64);
            },
        );
    }

    /// The legacy driver rotates the id itself on enrollment; this reports
    /// the current one
    pub fn invalidate_authenticator_id(&self) {
        info!(session = %self.inner.id, "invalidateAuthenticatorId");
        self.dispatch(
            SessionState::InvalidatingAuthenticatorId,
            "invalidate_authenticator_id",
            |inner| {
                let authenticator_id = inner.device.get_authenticator_id();
                info!(session = %inner.id, authenticator_id, "Authenticator id invalidated");
                inner
                    .callback
                    .on_authenticator_id_invalidated(authenticator_id as i64);
            },
        );
    }

    // =========================================================================
    // Lockout
    // =========================================================================

    /// Clear lockout and the failure counter, disabling any running expiry
    /// timer
    pub fn reset_lockout(&self, _hat: &HardwareAuthToken) {
        info!(session = %self.inner.id, "resetLockout");
        self.dispatch(SessionState::ResettingLockout, "reset_lockout", |inner| {
            inner.lockout.abort_timer();
            inner.lockout.clear_lockout(true);
        });
    }

    // =========================================================================
    // Pointer and UI events
    // =========================================================================

    pub fn on_pointer_down(&self, pointer_id: i32, x: i32, y: i32, minor: f32, major: f32) {
        info!(session = %self.inner.id, pointer_id, x, y, minor, major, "onPointerDown");
        self.dispatch_stateless("on_pointer_down", |inner| {
            if let Err(e) = inner.device.finger_down() {
                error!(session = %inner.id, code = e.code(), "Finger down failed");
            }
            inner.lockout.check_sensor_lockout();
        });
    }

    pub fn on_pointer_up(&self, pointer_id: i32) {
        info!(session = %self.inner.id, pointer_id, "onPointerUp");
        self.dispatch_stateless("on_pointer_up", |inner| {
            if let Err(e) = inner.device.finger_up() {
                error!(session = %inner.id, code = e.code(), "Finger up failed");
            }
        });
    }

    pub fn on_pointer_down_with_context(&self, context: &PointerContext) {
        self.on_pointer_down(
            context.pointer_id,
            context.x as i32,
            context.y as i32,
            context.minor,
            context.major,
        );
    }

    pub fn on_pointer_up_with_context(&self, context: &PointerContext) {
        self.on_pointer_up(context.pointer_id);
    }

    pub fn on_ui_ready(&self) {
        info!(session = %self.inner.id, "onUiReady");
        self.dispatch_stateless("on_ui_ready", |inner| inner.state.enter_idling());
    }

    pub fn on_context_changed(&self, context: &OperationContext) {
        debug!(session = %self.inner.id, ?context, "onContextChanged");
    }

    pub fn on_pointer_cancel_with_context(&self, context: &PointerContext) {
        debug!(session = %self.inner.id, pointer_id = context.pointer_id, "onPointerCancel");
    }

    pub fn set_ignore_display_touches(&self, should_ignore: bool) {
        debug!(session = %self.inner.id, should_ignore, "setIgnoreDisplayTouches");
    }

    // =========================================================================
    // Cancel / Close
    // =========================================================================

    /// Ask the driver to abort the running enroll/authenticate
    ///
    /// Runs on the worker after anything already queued. The caller gets
    /// CANCELED only if the driver acknowledges.
    pub fn cancel(&self) {
        info!(session = %self.inner.id, "cancel");
        self.dispatch_stateless("cancel", |inner| {
            match inner.device.cancel() {
                Ok(()) => inner.callback.on_error(SensorError::Canceled, 0),
                Err(e) => error!(session = %inner.id, code = e.code(), "Cancel failed"),
            }
            inner.state.enter_idling();
        });
    }

    /// Close the session; later calls are no-ops
    ///
    /// Runs on the calling thread. Work already queued may still report
    /// after this returns.
    pub fn close(&self) {
        if !self.inner.state.close() {
            debug!(session = %self.inner.id, "Session already closed");
            return;
        }
        info!(session = %self.inner.id, "close");

        self.inner.lockout.abort_timer();
        if let Some(handle) = self.inner.death_link.lock().take() {
            handle.abort();
        }
        self.inner.callback.on_session_closed();
    }

    /// Close the session once `client_gone` resolves
    ///
    /// `client_gone` is the transport's liveness signal for the caller.
    pub fn link_to_death<F>(&self, client_gone: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let session = Arc::downgrade(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            client_gone.await;
            if let Some(inner) = session.upgrade() {
                let session = Session { inner };
                if !session.is_closed() {
                    info!(session = %session.id(), "Client died, closing session");
                    session.close();
                }
            }
        });

        if let Some(previous) = self.inner.death_link.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("user_id", &self.inner.user_id)
            .field("state", &self.current_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatedConfig;
    use crate::device::{DeviceCall, SimulatedSensor};
    use crate::lockout::FailedAttemptTracker;
    use fpd_core::{ChannelCallback, SessionEvent};
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn context(sensor: Arc<SimulatedSensor>) -> SessionContext {
        SessionContext {
            device: sensor,
            lockout_tracker: Arc::new(FailedAttemptTracker::default()),
            worker: Arc::new(WorkerThread::new("fp-test")),
            runtime: Handle::current(),
            config: SessionConfig::default(),
            codes: VendorCodes::default(),
        }
    }

    fn session(
        sensor: Arc<SimulatedSensor>,
        user_id: i32,
    ) -> (Session, UnboundedReceiver<SessionEvent>) {
        let (callback, rx) = ChannelCallback::new();
        (Session::new(context(sensor), user_id, Arc::new(callback)), rx)
    }

    async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("callback channel closed")
    }

    #[tokio::test]
    async fn test_new_selects_template_group() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor.clone(), 10);

        assert_eq!(session.user_id(), 10);
        assert_eq!(session.current_state(), SessionState::Idling);

        // Selection runs on the worker before the next queued operation
        session.get_authenticator_id();
        assert!(matches!(
            next_event(&mut rx).await,
            SessionEvent::AuthenticatorIdRetrieved { .. }
        ));
        assert_eq!(
            sensor.calls()[0],
            DeviceCall::SetActiveGroup {
                gid: 10,
                store_path: PathBuf::from("/data/vendor_de/10/fpdata/")
            }
        );
        assert_eq!(
            sensor.active_group(),
            Some((10, PathBuf::from("/data/vendor_de/10/fpdata/")))
        );
    }

    #[tokio::test]
    #[should_panic(expected = "invalid user id")]
    async fn test_negative_user_id_panics() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let _ = session(sensor, -1);
    }

    #[tokio::test]
    async fn test_generate_challenge() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor.clone(), 0);

        session.generate_challenge();
        assert!(matches!(
            next_event(&mut rx).await,
            SessionEvent::ChallengeGenerated { .. }
        ));
        assert!(sensor.calls().contains(&DeviceCall::PreEnroll));
    }

    #[tokio::test]
    async fn test_revoke_challenge_failure_is_unable_to_process() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        sensor.fail_next(DeviceCall::PostEnroll, 3);
        let (session, mut rx) = session(sensor, 0);

        session.revoke_challenge(5);
        assert_eq!(
            next_event(&mut rx).await,
            SessionEvent::Error {
                error: SensorError::UnableToProcess,
                vendor_code: 0
            }
        );

        session.revoke_challenge(5);
        assert_eq!(
            next_event(&mut rx).await,
            SessionEvent::ChallengeRevoked { challenge: 5 }
        );
    }

    #[tokio::test]
    async fn test_detect_interaction_unsupported() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor, 0);

        let _signal = session.detect_interaction();
        assert_eq!(
            next_event(&mut rx).await,
            SessionEvent::Error {
                error: SensorError::UnableToProcess,
                vendor_code: 0
            }
        );
    }

    #[tokio::test]
    async fn test_context_and_ui_operations() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor.clone(), 0);

        let pointer = PointerContext {
            pointer_id: 2,
            x: 540.0,
            y: 1600.0,
            ..Default::default()
        };
        session.on_pointer_down_with_context(&pointer);
        session.on_pointer_up_with_context(&pointer);
        session.on_pointer_cancel_with_context(&pointer);
        session.on_context_changed(&OperationContext::default());
        session.set_ignore_display_touches(true);
        session.on_ui_ready();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !sensor.calls().contains(&DeviceCall::FingerUp)
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let calls = sensor.calls();
        assert_eq!(
            calls[calls.len() - 2..],
            [DeviceCall::FingerDown, DeviceCall::FingerUp]
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(session.current_state(), SessionState::Idling);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor, 0);

        session.close();
        session.close();
        assert_eq!(next_event(&mut rx).await, SessionEvent::SessionClosed);
        assert!(rx.try_recv().is_err());
        assert_eq!(session.current_state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_requests_after_close_are_dropped() {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig::default()));
        let (session, mut rx) = session(sensor.clone(), 0);
        session.close();
        assert_eq!(next_event(&mut rx).await, SessionEvent::SessionClosed);

        session.generate_challenge();
        session.on_pointer_down(0, 1, 2, 3.0, 4.0);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(rx.try_recv().is_err());
        assert!(!sensor.calls().contains(&DeviceCall::PreEnroll));
        assert!(!sensor.calls().contains(&DeviceCall::FingerDown));
    }
}
