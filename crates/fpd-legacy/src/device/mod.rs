//! Device layer for legacy fingerprint drivers
//!
//! This module provides the driver abstraction the session engine talks to:
//! - `FingerprintDevice`: blocking calls plus a notification channel
//! - `SimulatedSensor`: in-process sensor for tests and the daemon
//!
//! # Example
//!
//! ```ignore
//! use fpd_legacy::device::create_device;
//! use fpd_legacy::config::DeviceConfig;
//!
//! let device = create_device(&DeviceConfig::default());
//! let mut events = device.subscribe();
//! device.authenticate(0, 0)?;
//! ```

mod adapter;
pub mod error;
pub mod mock;

pub use adapter::{DeviceMessage, FingerId, FingerprintDevice};
pub use error::DeviceError;
pub use mock::{DeviceCall, SimulatedSensor};

use std::sync::Arc;

use crate::config::DeviceConfig;

/// Create a device backend based on configuration
pub fn create_device(config: &DeviceConfig) -> Arc<dyn FingerprintDevice> {
    match config {
        DeviceConfig::Simulated(cfg) => Arc::new(SimulatedSensor::new(cfg)),
    }
}
