//! Fingerprint service errors

use thiserror::Error;

use crate::config::ConfigError;

/// Service-level errors
///
/// Driver failures never show up here; they reach the caller as session
/// callback notifications.
#[derive(Debug, Error)]
pub enum HalError {
    /// No sensor with this id
    #[error("Invalid sensor id: {0}")]
    InvalidSensorId(i32),

    /// The previous session has not been closed yet
    #[error("A session is already open")]
    SessionAlreadyOpen,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
