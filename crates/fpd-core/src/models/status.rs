//! Status taxonomy reported to session callers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error kinds delivered through `SessionCallback::on_error`
///
/// Anything the driver reports outside this set travels as `Vendor` with a
/// vendor sub-code next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i8)]
pub enum SensorError {
    Unknown = 0,
    HwUnavailable = 1,
    UnableToProcess = 2,
    Timeout = 3,
    NoSpace = 4,
    Canceled = 5,
    UnableToRemove = 6,
    Vendor = 7,
    BadCalibration = 8,
    PowerPress = 9,
}

impl From<SensorError> for i8 {
    fn from(err: SensorError) -> Self {
        err as i8
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::HwUnavailable => "HW_UNAVAILABLE",
            Self::UnableToProcess => "UNABLE_TO_PROCESS",
            Self::Timeout => "TIMEOUT",
            Self::NoSpace => "NO_SPACE",
            Self::Canceled => "CANCELED",
            Self::UnableToRemove => "UNABLE_TO_REMOVE",
            Self::Vendor => "VENDOR",
            Self::BadCalibration => "BAD_CALIBRATION",
            Self::PowerPress => "POWER_PRESS",
        };
        f.write_str(s)
    }
}

/// Image acquisition feedback delivered through `SessionCallback::on_acquired`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i8)]
pub enum AcquiredInfo {
    Unknown = 0,
    Good = 1,
    Partial = 2,
    Insufficient = 3,
    SensorDirty = 4,
    TooSlow = 5,
    TooFast = 6,
    Vendor = 7,
    Start = 8,
    TooDark = 9,
    TooBright = 10,
    Immobile = 11,
    RetryingCapture = 12,
}

impl From<AcquiredInfo> for i8 {
    fn from(info: AcquiredInfo) -> Self {
        info as i8
    }
}

impl fmt::Display for AcquiredInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Good => "GOOD",
            Self::Partial => "PARTIAL",
            Self::Insufficient => "INSUFFICIENT",
            Self::SensorDirty => "SENSOR_DIRTY",
            Self::TooSlow => "TOO_SLOW",
            Self::TooFast => "TOO_FAST",
            Self::Vendor => "VENDOR",
            Self::Start => "START",
            Self::TooDark => "TOO_DARK",
            Self::TooBright => "TOO_BRIGHT",
            Self::Immobile => "IMMOBILE",
            Self::RetryingCapture => "RETRYING_CAPTURE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wire_values() {
        assert_eq!(i8::from(SensorError::HwUnavailable), 1);
        assert_eq!(i8::from(SensorError::Canceled), 5);
        assert_eq!(i8::from(SensorError::Vendor), 7);
    }

    #[test]
    fn test_error_serializes_like_display() {
        let json = serde_json::to_string(&SensorError::UnableToProcess).unwrap();
        assert_eq!(json, format!("\"{}\"", SensorError::UnableToProcess));
        let json = serde_json::to_string(&AcquiredInfo::SensorDirty).unwrap();
        assert_eq!(json, format!("\"{}\"", AcquiredInfo::SensorDirty));
    }
}
