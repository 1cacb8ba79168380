//! Simulated sensor for testing and demos
//!
//! Behaves like a legacy driver: blocking calls return as soon as the
//! command is accepted and results arrive as notifications. Touches are
//! simulated with [`SimulatedSensor::touch`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::mem::{self, Discriminant};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use fpd_core::authenticator_type;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::{DeviceError, DeviceMessage, FingerId, FingerprintDevice};
use crate::config::SimulatedConfig;
use crate::token::LegacyAuthToken;
use crate::vendor::error_code;

/// One driver call as recorded by the simulated sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    PreEnroll,
    PostEnroll,
    Enroll { gid: u32, timeout_sec: u32 },
    Authenticate { operation_id: u64, gid: u32 },
    Cancel,
    Enumerate,
    Remove { gid: u32, fid: u32 },
    GetAuthenticatorId,
    SetActiveGroup { gid: u32, store_path: PathBuf },
    FingerDown,
    FingerUp,
}

#[derive(Debug, Clone)]
enum ActiveOp {
    Enrolling { gid: u32, fid: u32, remaining: u32 },
    Authenticating { operation_id: u64, gid: u32 },
}

/// Simulated fingerprint sensor
pub struct SimulatedSensor {
    latency: RwLock<Duration>,
    enroll_samples: u32,
    connected: AtomicBool,
    started: Instant,
    incoming_tx: broadcast::Sender<DeviceMessage>,
    /// Enrolled templates per group
    templates: RwLock<BTreeMap<u32, BTreeSet<u32>>>,
    active: Mutex<Option<ActiveOp>>,
    active_group: RwLock<Option<(u32, PathBuf)>>,
    next_fid: AtomicU64,
    next_challenge: AtomicU64,
    authenticator_id: AtomicU64,
    calls: Mutex<Vec<DeviceCall>>,
    in_flight: AtomicUsize,
    overlapping: AtomicUsize,
    /// One-shot failures keyed by call kind
    scripted_failures: Mutex<Vec<(Discriminant<DeviceCall>, i32)>>,
    /// Persistent removal failures keyed by template id
    remove_failures: Mutex<HashMap<u32, i32>>,
}

struct CallGuard<'a> {
    sensor: &'a SimulatedSensor,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.sensor.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedSensor {
    pub fn new(config: &SimulatedConfig) -> Self {
        let (incoming_tx, _) = broadcast::channel(256);
        Self {
            latency: RwLock::new(Duration::from_millis(config.latency_ms)),
            enroll_samples: config.enroll_samples.max(1) as u32,
            connected: AtomicBool::new(true),
            started: Instant::now(),
            incoming_tx,
            templates: RwLock::new(BTreeMap::new()),
            active: Mutex::new(None),
            active_group: RwLock::new(None),
            next_fid: AtomicU64::new(1),
            next_challenge: AtomicU64::new(0x5EED_0001),
            authenticator_id: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            overlapping: AtomicUsize::new(0),
            scripted_failures: Mutex::new(Vec::new()),
            remove_failures: Mutex::new(HashMap::new()),
        }
    }

    /// Set the time each blocking call takes
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Simulate the driver going away; every call fails until reconnected
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make the next call of the same kind as `call` fail with `code`
    ///
    /// Field values of `call` are ignored.
    pub fn fail_next(&self, call: DeviceCall, code: i32) {
        self.scripted_failures
            .lock()
            .push((mem::discriminant(&call), code));
    }

    /// Make every removal of `fid` fail with `code`
    pub fn fail_remove(&self, fid: u32, code: i32) {
        self.remove_failures.lock().insert(fid, code);
    }

    /// Add a template without going through enrollment
    pub fn add_template(&self, gid: u32, fid: u32) {
        self.templates.write().entry(gid).or_default().insert(fid);
        let next = u64::from(fid) + 1;
        self.next_fid.fetch_max(next, Ordering::SeqCst);
    }

    /// Enrolled template ids of a group
    pub fn templates(&self, gid: u32) -> Vec<u32> {
        self.templates
            .read()
            .get(&gid)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Recorded driver calls, oldest first
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Calls that started while another call was still running
    pub fn overlapping_calls(&self) -> usize {
        self.overlapping.load(Ordering::SeqCst)
    }

    /// Group selected by the last `set_active_group`
    pub fn active_group(&self) -> Option<(u32, PathBuf)> {
        self.active_group.read().clone()
    }

    /// Whether an enroll or authenticate is armed
    pub fn is_busy(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Deliver a raw notification as if the driver had sent it
    pub fn inject(&self, msg: DeviceMessage) {
        let _ = self.incoming_tx.send(msg);
    }

    /// Simulate a finger on the sensor
    ///
    /// `fid` is the template the finger matches, `None` for an unknown
    /// finger. Returns false when no enroll/authenticate is armed.
    pub fn touch(&self, fid: Option<u32>) -> bool {
        let mut active = self.active.lock();
        match active.clone() {
            Some(ActiveOp::Enrolling {
                gid,
                fid: new_fid,
                remaining,
            }) => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    *active = None;
                    self.add_template(gid, new_fid);
                    self.authenticator_id.fetch_add(1, Ordering::SeqCst);
                } else {
                    *active = Some(ActiveOp::Enrolling {
                        gid,
                        fid: new_fid,
                        remaining,
                    });
                }
                self.inject(DeviceMessage::TemplateEnrolling {
                    finger: FingerId { gid, fid: new_fid },
                    samples_remaining: remaining,
                });
                true
            }
            Some(ActiveOp::Authenticating { operation_id, gid }) => {
                let matched = fid.filter(|f| {
                    self.templates
                        .read()
                        .get(&gid)
                        .is_some_and(|set| set.contains(f))
                });
                match matched {
                    Some(fid) => {
                        *active = None;
                        let hat = self.mint_token(operation_id, gid);
                        self.inject(DeviceMessage::Authenticated {
                            finger: FingerId { gid, fid },
                            hat,
                        });
                    }
                    // A rejected finger keeps the matcher armed
                    None => self.inject(DeviceMessage::Authenticated {
                        finger: FingerId { gid, fid: 0 },
                        hat: LegacyAuthToken::default(),
                    }),
                }
                true
            }
            None => false,
        }
    }

    fn mint_token(&self, operation_id: u64, gid: u32) -> LegacyAuthToken {
        let timestamp_ms = self.started.elapsed().as_millis() as u64;
        LegacyAuthToken {
            version: 0,
            challenge: operation_id,
            user_id: u64::from(gid),
            authenticator_id: self.authenticator_id.load(Ordering::SeqCst),
            authenticator_type: authenticator_type::FINGERPRINT.to_be(),
            timestamp: timestamp_ms.to_be(),
            hmac: [0u8; 32],
        }
    }

    /// Record a call, flag overlap and simulate latency
    fn begin(&self, call: DeviceCall) -> Result<CallGuard<'_>, DeviceError> {
        let previous = self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = CallGuard { sensor: self };
        if previous > 0 {
            self.overlapping.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(?call, "Simulated sensor: overlapping driver call");
        }

        let kind = mem::discriminant(&call);
        self.calls.lock().push(call);

        if !self.connected.load(Ordering::SeqCst) {
            return Err(DeviceError::Unavailable(
                "simulated sensor disconnected".to_string(),
            ));
        }

        let latency = *self.latency.read();
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        let mut failures = self.scripted_failures.lock();
        if let Some(pos) = failures.iter().position(|(k, _)| *k == kind) {
            let (_, code) = failures.remove(pos);
            return Err(DeviceError::Status(code));
        }
        Ok(guard)
    }
}

impl FingerprintDevice for SimulatedSensor {
    fn pre_enroll(&self) -> u64 {
        let _guard = self.begin(DeviceCall::PreEnroll);
        self.next_challenge.fetch_add(1, Ordering::SeqCst)
    }

    fn post_enroll(&self) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::PostEnroll)?;
        Ok(())
    }

    fn enroll(
        &self,
        _hat: &LegacyAuthToken,
        gid: u32,
        timeout_sec: u32,
    ) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::Enroll { gid, timeout_sec })?;
        let enrolled = self.templates(gid).len();
        if enrolled >= 5 {
            return Err(DeviceError::Status(error_code::NO_SPACE));
        }
        let fid = self.next_fid.fetch_add(1, Ordering::SeqCst) as u32;
        *self.active.lock() = Some(ActiveOp::Enrolling {
            gid,
            fid,
            remaining: self.enroll_samples,
        });
        Ok(())
    }

    fn authenticate(&self, operation_id: u64, gid: u32) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::Authenticate { operation_id, gid })?;
        *self.active.lock() = Some(ActiveOp::Authenticating { operation_id, gid });
        Ok(())
    }

    fn cancel(&self) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::Cancel)?;
        *self.active.lock() = None;
        Ok(())
    }

    fn enumerate(&self) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::Enumerate)?;
        let gid = self.active_group.read().as_ref().map(|(gid, _)| *gid);
        let fids = gid.map(|gid| self.templates(gid)).unwrap_or_default();
        let gid = gid.unwrap_or_default();

        if fids.is_empty() {
            self.inject(DeviceMessage::TemplateEnumerating {
                finger: FingerId { gid, fid: 0 },
                remaining_templates: 0,
            });
            return Ok(());
        }

        let total = fids.len() as u32;
        for (i, fid) in fids.into_iter().enumerate() {
            self.inject(DeviceMessage::TemplateEnumerating {
                finger: FingerId { gid, fid },
                remaining_templates: total - 1 - i as u32,
            });
        }
        Ok(())
    }

    fn remove(&self, gid: u32, fid: u32) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::Remove { gid, fid })?;
        if let Some(code) = self.remove_failures.lock().get(&fid).copied() {
            return Err(DeviceError::Status(code));
        }

        let remaining = {
            let mut templates = self.templates.write();
            let set = templates.entry(gid).or_default();
            if !set.remove(&fid) {
                return Err(DeviceError::Status(error_code::UNABLE_TO_REMOVE));
            }
            set.len() as u32
        };
        self.inject(DeviceMessage::TemplateRemoved {
            finger: FingerId { gid, fid },
            remaining_templates: remaining,
        });
        Ok(())
    }

    fn get_authenticator_id(&self) -> u64 {
        let _guard = self.begin(DeviceCall::GetAuthenticatorId);
        self.authenticator_id.load(Ordering::SeqCst)
    }

    fn set_active_group(&self, gid: u32, store_path: &Path) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::SetActiveGroup {
            gid,
            store_path: store_path.to_path_buf(),
        })?;
        *self.active_group.write() = Some((gid, store_path.to_path_buf()));
        Ok(())
    }

    fn finger_down(&self) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::FingerDown)?;
        Ok(())
    }

    fn finger_up(&self) -> Result<(), DeviceError> {
        let _guard = self.begin(DeviceCall::FingerUp)?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceMessage> {
        self.incoming_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor() -> SimulatedSensor {
        SimulatedSensor::new(&SimulatedConfig {
            latency_ms: 0,
            enroll_samples: 2,
        })
    }

    #[test]
    fn test_enroll_then_authenticate() {
        let sensor = sensor();
        let mut rx = sensor.subscribe();

        sensor
            .enroll(&LegacyAuthToken::default(), 0, 60)
            .unwrap();
        assert!(sensor.touch(None));
        assert!(sensor.touch(None));
        assert!(!sensor.is_busy());
        assert_eq!(sensor.templates(0), vec![1]);

        assert!(matches!(
            rx.try_recv().unwrap(),
            DeviceMessage::TemplateEnrolling {
                samples_remaining: 1,
                ..
            }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            DeviceMessage::TemplateEnrolling {
                finger: FingerId { gid: 0, fid: 1 },
                samples_remaining: 0,
            }
        ));

        sensor.authenticate(77, 0).unwrap();
        assert!(sensor.touch(Some(9)));
        assert!(sensor.is_busy());
        assert!(sensor.touch(Some(1)));
        assert!(!sensor.is_busy());

        match rx.try_recv().unwrap() {
            DeviceMessage::Authenticated { finger, .. } => assert_eq!(finger.fid, 0),
            other => panic!("Expected rejection, got {:?}", other),
        }
        match rx.try_recv().unwrap() {
            DeviceMessage::Authenticated { finger, hat } => {
                assert_eq!(finger.fid, 1);
                assert_eq!(hat.challenge, 77);
                assert_eq!(
                    hat.to_hardware().authenticator_type,
                    authenticator_type::FINGERPRINT
                );
            }
            other => panic!("Expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_touch_without_operation() {
        assert!(!sensor().touch(Some(1)));
    }

    #[test]
    fn test_scripted_failure_is_one_shot() {
        let sensor = sensor();
        sensor.fail_next(DeviceCall::Cancel, 3);
        assert_eq!(sensor.cancel(), Err(DeviceError::Status(3)));
        assert_eq!(sensor.cancel(), Ok(()));
        assert_eq!(sensor.calls(), vec![DeviceCall::Cancel, DeviceCall::Cancel]);
    }

    #[test]
    fn test_enumerate_counts_down() {
        let sensor = sensor();
        sensor
            .set_active_group(3, Path::new("/tmp/fp"))
            .unwrap();
        sensor.add_template(3, 5);
        sensor.add_template(3, 7);
        let mut rx = sensor.subscribe();

        sensor.enumerate().unwrap();

        let mut seen = Vec::new();
        while let Ok(DeviceMessage::TemplateEnumerating {
            finger,
            remaining_templates,
        }) = rx.try_recv()
        {
            seen.push((finger.fid, remaining_templates));
        }
        assert_eq!(seen, vec![(5, 1), (7, 0)]);
    }

    #[test]
    fn test_disconnected_sensor() {
        let sensor = sensor();
        sensor.set_connected(false);
        let err = sensor.authenticate(1, 0).unwrap_err();
        assert_eq!(err.code(), -1);
        assert!(!sensor.is_busy());

        sensor.set_connected(true);
        assert!(sensor.authenticate(1, 0).is_ok());
    }

    #[test]
    fn test_remove_unknown_template_fails() {
        let sensor = sensor();
        assert_eq!(
            sensor.remove(0, 42),
            Err(DeviceError::Status(error_code::UNABLE_TO_REMOVE))
        );
    }
}
