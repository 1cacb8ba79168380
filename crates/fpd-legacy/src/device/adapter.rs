//! Device trait and notification types

use std::path::Path;

use tokio::sync::broadcast;

use super::DeviceError;
use crate::token::LegacyAuthToken;

/// Template identity as reported by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FingerId {
    /// Template group (the user id)
    pub gid: u32,
    /// Template id within the group; 0 means "no template"
    pub fid: u32,
}

/// Asynchronous notification from the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Terminal error for the running operation, raw driver code
    Error { code: i32 },
    /// Image acquisition feedback, raw driver code
    Acquired { info: i32 },
    /// One enrollment sample taken
    TemplateEnrolling {
        finger: FingerId,
        samples_remaining: u32,
    },
    /// One template removed
    TemplateRemoved {
        finger: FingerId,
        remaining_templates: u32,
    },
    /// Match result; `finger.fid == 0` is a rejected finger
    Authenticated {
        finger: FingerId,
        hat: LegacyAuthToken,
    },
    /// One template reported during enumeration
    TemplateEnumerating {
        finger: FingerId,
        remaining_templates: u32,
    },
}

/// Legacy fingerprint driver
///
/// Every call blocks until the driver accepts or rejects the command; the
/// outcome of long-running commands (enroll, authenticate, enumerate) arrives
/// later through `subscribe`. The driver is single-threaded: callers must
/// never issue two calls at once.
pub trait FingerprintDevice: Send + Sync {
    /// Generate an enrollment challenge
    fn pre_enroll(&self) -> u64;

    /// Invalidate the enrollment challenge
    fn post_enroll(&self) -> Result<(), DeviceError>;

    /// Start enrolling a template for `gid`
    fn enroll(&self, hat: &LegacyAuthToken, gid: u32, timeout_sec: u32)
        -> Result<(), DeviceError>;

    /// Start matching against templates of `gid`
    fn authenticate(&self, operation_id: u64, gid: u32) -> Result<(), DeviceError>;

    /// Abort the running enroll/authenticate
    fn cancel(&self) -> Result<(), DeviceError>;

    /// Start reporting enrolled templates
    fn enumerate(&self) -> Result<(), DeviceError>;

    /// Remove one template
    fn remove(&self, gid: u32, fid: u32) -> Result<(), DeviceError>;

    fn get_authenticator_id(&self) -> u64;

    /// Select the template group and its storage directory
    fn set_active_group(&self, gid: u32, store_path: &Path) -> Result<(), DeviceError>;

    /// Finger landed on the sensor area (under-display sensors)
    fn finger_down(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Finger left the sensor area (under-display sensors)
    fn finger_up(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Subscribe to driver notifications
    fn subscribe(&self) -> broadcast::Receiver<DeviceMessage>;
}
