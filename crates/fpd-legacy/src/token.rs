//! Legacy driver auth token
//!
//! The driver exchanges auth tokens as a packed C struct:
//!
//! ```text
//! offset size field
//!      0    1 version
//!      1    8 challenge            (host order)
//!      9    8 user_id              (host order)
//!     17    8 authenticator_id     (host order)
//!     25    4 authenticator_type   (network order)
//!     29    8 timestamp            (network order)
//!     37   32 hmac
//! ```
//!
//! Host order is little-endian on every supported target.

use bytes::{Buf, BufMut, BytesMut};
use fpd_core::HardwareAuthToken;

/// Packed size of a legacy auth token
pub const LEGACY_TOKEN_LEN: usize = 69;

const HMAC_LEN: usize = 32;

/// Auth token in the driver's layout
///
/// `authenticator_type` and `timestamp` hold the network-order (big-endian)
/// representation, exactly as the driver sees them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyAuthToken {
    pub version: u8,
    pub challenge: u64,
    pub user_id: u64,
    pub authenticator_id: u64,
    pub authenticator_type: u32,
    pub timestamp: u64,
    pub hmac: [u8; HMAC_LEN],
}

impl LegacyAuthToken {
    /// Build the driver token for a caller token
    pub fn from_hardware(hat: &HardwareAuthToken) -> Self {
        let mut hmac = [0u8; HMAC_LEN];
        let n = hat.mac.len().min(HMAC_LEN);
        hmac[..n].copy_from_slice(&hat.mac[..n]);

        Self {
            version: 0,
            challenge: hat.challenge as u64,
            user_id: hat.user_id as u64,
            authenticator_id: hat.authenticator_id as u64,
            authenticator_type: hat.authenticator_type.to_be(),
            timestamp: (hat.timestamp_ms as u64).to_be(),
            hmac,
        }
    }

    /// Build the caller token for a driver token
    pub fn to_hardware(&self) -> HardwareAuthToken {
        HardwareAuthToken {
            challenge: self.challenge as i64,
            user_id: self.user_id as i64,
            authenticator_id: self.authenticator_id as i64,
            authenticator_type: u32::from_be(self.authenticator_type),
            timestamp_ms: u64::from_be(self.timestamp) as i64,
            mac: self.hmac.to_vec(),
        }
    }

    /// Encode in the packed driver layout
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(LEGACY_TOKEN_LEN);
        buf.put_u8(self.version);
        buf.put_u64_le(self.challenge);
        buf.put_u64_le(self.user_id);
        buf.put_u64_le(self.authenticator_id);
        // Already in network order; copy the in-memory bytes through.
        buf.put_u32_ne(self.authenticator_type);
        buf.put_u64_ne(self.timestamp);
        buf.put_slice(&self.hmac);
        buf
    }

    /// Decode from the packed driver layout; `None` when `data` is short
    pub fn from_bytes(mut data: &[u8]) -> Option<Self> {
        if data.len() < LEGACY_TOKEN_LEN {
            return None;
        }
        let version = data.get_u8();
        let challenge = data.get_u64_le();
        let user_id = data.get_u64_le();
        let authenticator_id = data.get_u64_le();
        let authenticator_type = data.get_u32_ne();
        let timestamp = data.get_u64_ne();
        let mut hmac = [0u8; HMAC_LEN];
        data.copy_to_slice(&mut hmac);

        Some(Self {
            version,
            challenge,
            user_id,
            authenticator_id,
            authenticator_type,
            timestamp,
            hmac,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpd_core::authenticator_type;
    use pretty_assertions::assert_eq;

    fn sample_hat() -> HardwareAuthToken {
        HardwareAuthToken {
            challenge: 0x1122_3344_5566_7788,
            user_id: 10,
            authenticator_id: 42,
            authenticator_type: authenticator_type::FINGERPRINT,
            timestamp_ms: 123_456,
            mac: (0u8..32).collect(),
        }
    }

    #[test]
    fn test_network_order_fields() {
        let legacy = LegacyAuthToken::from_hardware(&sample_hat());
        let bytes = legacy.to_bytes();

        assert_eq!(bytes.len(), LEGACY_TOKEN_LEN);
        assert_eq!(bytes[0], 0);
        // challenge is host (little-endian) order
        assert_eq!(&bytes[1..9], &0x1122_3344_5566_7788u64.to_le_bytes());
        // authenticator type and timestamp are big-endian on the wire
        assert_eq!(&bytes[25..29], &[0, 0, 0, 2]);
        assert_eq!(&bytes[29..37], &123_456u64.to_be_bytes());
        assert_eq!(bytes[37], 0);
        assert_eq!(bytes[68], 31);
    }

    #[test]
    fn test_driver_token_back_to_caller_token() {
        let legacy = LegacyAuthToken::from_hardware(&sample_hat());
        let decoded = LegacyAuthToken::from_bytes(&legacy.to_bytes()).unwrap();
        assert_eq!(decoded.to_hardware(), sample_hat());
    }

    #[test]
    fn test_short_mac_is_zero_padded() {
        let hat = HardwareAuthToken {
            mac: vec![0xAA; 4],
            ..Default::default()
        };
        let legacy = LegacyAuthToken::from_hardware(&hat);
        assert_eq!(&legacy.hmac[..4], &[0xAA; 4]);
        assert!(legacy.hmac[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_input() {
        assert!(LegacyAuthToken::from_bytes(&[0u8; LEGACY_TOKEN_LEN - 1]).is_none());
    }
}
