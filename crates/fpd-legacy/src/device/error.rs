//! Device layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Non-zero status returned by a driver call
    #[error("Driver call failed with status {0}")]
    Status(i32),

    #[error("Device not available: {0}")]
    Unavailable(String),
}

impl DeviceError {
    /// Raw status code for logging (-1 when the driver never answered)
    pub fn code(&self) -> i32 {
        match self {
            DeviceError::Status(code) => *code,
            DeviceError::Unavailable(_) => -1,
        }
    }
}
