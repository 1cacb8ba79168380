//! Shared harness for session integration tests
//!
//! Runs a `Fingerprint` service over the simulated sensor and exposes the
//! session callback as an event stream.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fpd_legacy::config::{HalConfig, LockoutConfig, SimulatedConfig};
use fpd_legacy::device::SimulatedSensor;
use fpd_legacy::{ChannelCallback, Fingerprint, Session, SessionEvent};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub hal: Fingerprint,
    pub sensor: Arc<SimulatedSensor>,
    pub session: Session,
    pub events: UnboundedReceiver<SessionEvent>,
}

impl Harness {
    /// Service with default config and an open session for user 0
    pub fn new() -> Self {
        Self::with_config(HalConfig::default())
    }

    pub fn with_lockout(lockout: LockoutConfig) -> Self {
        Self::with_config(HalConfig {
            lockout,
            ..Default::default()
        })
    }

    pub fn with_config(config: HalConfig) -> Self {
        let sensor = Arc::new(SimulatedSensor::new(&SimulatedConfig {
            latency_ms: 0,
            enroll_samples: 3,
        }));
        let hal = Fingerprint::new(config, sensor.clone(), Handle::current());

        let (callback, events) = ChannelCallback::new();
        let session = hal
            .create_session(0, 0, Arc::new(callback))
            .expect("create session");

        Self {
            hal,
            sensor,
            session,
            events,
        }
    }

    /// Next callback event, failing the test after `EVENT_TIMEOUT`
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("callback channel closed")
    }

    /// Assert no callback arrives within `window`
    pub async fn assert_quiet(&mut self, window: Duration) {
        if let Ok(Some(event)) = tokio::time::timeout(window, self.events.recv()).await {
            panic!("unexpected event: {:?}", event);
        }
    }

    /// Wait until the simulated sensor has an enroll/authenticate armed
    pub async fn wait_sensor_busy(&self) {
        let sensor = self.sensor.clone();
        wait_until(move || sensor.is_busy()).await;
    }
}

/// Poll `condition` until it holds, failing the test after `EVENT_TIMEOUT`
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
