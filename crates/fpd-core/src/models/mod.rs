//! Data models shared across fingerprint session crates

mod sensor;
mod status;
mod token;

pub use sensor::{
    ComponentInfo, OperationContext, PointerContext, SensorLocation, SensorProps, SensorStrength,
    SensorType,
};
pub use status::{AcquiredInfo, SensorError};
pub use token::{authenticator_type, HardwareAuthToken};
