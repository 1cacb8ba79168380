//! Fingerprint service entry point
//!
//! Owns the device, the shared worker and failure tracker, creates sessions
//! and forwards driver notifications to the open one.

use std::path::Path;
use std::sync::Arc;

use fpd_core::{SensorProps, SessionCallback};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::HalConfig;
use crate::device::{create_device, FingerprintDevice};
use crate::error::HalError;
use crate::lockout::FailedAttemptTracker;
use crate::session::{Session, SessionContext};
use crate::vendor::VendorCodes;
use crate::worker::WorkerThread;

/// Fingerprint service for one legacy sensor
pub struct Fingerprint {
    config: HalConfig,
    device: Arc<dyn FingerprintDevice>,
    /// Shared by every session so lockout outlives session turnover
    lockout_tracker: Arc<FailedAttemptTracker>,
    worker: Arc<WorkerThread>,
    codes: VendorCodes,
    runtime: Handle,
    session: Arc<RwLock<Option<Session>>>,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Fingerprint {
    pub fn new(config: HalConfig, device: Arc<dyn FingerprintDevice>, runtime: Handle) -> Self {
        let lockout_tracker = Arc::new(FailedAttemptTracker::new(config.lockout.clone()));
        let codes = VendorCodes::from_overrides(&config.vendor_codes);

        let hal = Self {
            config,
            device,
            lockout_tracker,
            worker: Arc::new(WorkerThread::new("fingerprint-worker")),
            codes,
            runtime,
            session: Arc::new(RwLock::new(None)),
            listener_handle: Mutex::new(None),
        };

        hal.start_listener();

        info!(
            sensor_id = hal.config.sensor.sensor_id,
            sensor_type = ?hal.config.sensor.sensor_type,
            "Fingerprint service started"
        );
        hal
    }

    /// Load configuration and build the configured device
    pub fn from_config_file(path: impl AsRef<Path>, runtime: Handle) -> Result<Self, HalError> {
        let config = HalConfig::load(path)?;
        let device = create_device(&config.device);
        Ok(Self::new(config, device, runtime))
    }

    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    pub fn device(&self) -> Arc<dyn FingerprintDevice> {
        Arc::clone(&self.device)
    }

    pub fn lockout_tracker(&self) -> Arc<FailedAttemptTracker> {
        Arc::clone(&self.lockout_tracker)
    }

    /// Properties of the one sensor this service drives
    pub fn sensor_props(&self) -> Vec<SensorProps> {
        let sensor = &self.config.sensor;
        vec![SensorProps {
            sensor_id: sensor.sensor_id,
            sensor_strength: sensor.strength,
            max_enrollments_per_user: sensor.max_enrollments_per_user,
            sensor_type: sensor.sensor_type,
            sensor_locations: sensor.location.iter().cloned().collect(),
            supports_navigation_gestures: sensor.supports_navigation_gestures,
            supports_detect_interaction: false,
            component_info: sensor.components.clone(),
        }]
    }

    /// Open a session for `user_id`
    ///
    /// Panics if `user_id` is negative.
    pub fn create_session(
        &self,
        sensor_id: i32,
        user_id: i32,
        callback: Arc<dyn SessionCallback>,
    ) -> Result<Session, HalError> {
        if sensor_id != self.config.sensor.sensor_id {
            return Err(HalError::InvalidSensorId(sensor_id));
        }

        let mut current = self.session.write();
        if current.as_ref().is_some_and(|s| !s.is_closed()) {
            return Err(HalError::SessionAlreadyOpen);
        }

        let ctx = SessionContext {
            device: Arc::clone(&self.device),
            lockout_tracker: self.lockout_tracker.clone(),
            worker: Arc::clone(&self.worker),
            runtime: self.runtime.clone(),
            config: self.config.session.clone(),
            codes: self.codes.clone(),
        };
        let session = Session::new(ctx, user_id, callback);
        *current = Some(session.clone());

        info!(sensor_id, user_id, session = %session.id(), "createSession");
        Ok(session)
    }

    /// The most recently created session, closed or not
    pub fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn start_listener(&self) {
        let mut incoming_rx = self.device.subscribe();
        let session = Arc::clone(&self.session);

        let handle = self.runtime.spawn(async move {
            loop {
                match incoming_rx.recv().await {
                    Ok(msg) => {
                        let target = session.read().clone();
                        match target {
                            Some(session) => session.notify(&msg),
                            None => debug!(?msg, "No session, notification dropped"),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Device notification listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Device notification channel closed");
                        break;
                    }
                }
            }
        });

        *self.listener_handle.lock() = Some(handle);
    }
}

impl Drop for Fingerprint {
    fn drop(&mut self) {
        if let Some(handle) = self.listener_handle.get_mut().take() {
            handle.abort();
        }
    }
}
