//! Hardware auth token as seen by session callers

use serde::{Deserialize, Serialize};

/// Authenticator type bits carried in `HardwareAuthToken::authenticator_type`
pub mod authenticator_type {
    pub const NONE: u32 = 0;
    pub const PASSWORD: u32 = 1 << 0;
    pub const FINGERPRINT: u32 = 1 << 1;
    pub const ANY: u32 = 0xFFFF_FFFF;
}

/// Proof of a recent successful authentication, signed by the TEE
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAuthToken {
    pub challenge: i64,
    pub user_id: i64,
    pub authenticator_id: i64,
    /// Bit set of `authenticator_type` values
    pub authenticator_type: u32,
    /// Milliseconds since boot at which the token was minted
    pub timestamp_ms: i64,
    /// 32-byte HMAC over the other fields
    pub mac: Vec<u8>,
}
