//! Fingerprint service configuration
//!
//! This module contains configuration types for the fingerprint service,
//! including sensor properties, session behaviour, lockout policy, the
//! device backend and vendor code overrides.

use std::path::{Path, PathBuf};

use fpd_core::{ComponentInfo, SensorLocation, SensorStrength, SensorType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the fingerprint service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HalConfig {
    /// Advertised sensor properties
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Per-session behaviour
    #[serde(default)]
    pub session: SessionConfig,
    /// Failure accounting policy
    #[serde(default)]
    pub lockout: LockoutConfig,
    /// Device backend
    #[serde(default)]
    pub device: DeviceConfig,
    /// Vendor status code overrides for non-standard drivers
    #[serde(default)]
    pub vendor_codes: VendorCodeOverrides,
}

impl HalConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

// =============================================================================
// Sensor Configuration
// =============================================================================

/// Sensor properties reported by `Fingerprint::sensor_props`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub sensor_id: i32,
    #[serde(default)]
    pub strength: SensorStrength,
    #[serde(default)]
    pub sensor_type: SensorType,
    #[serde(default = "default_max_enrollments")]
    pub max_enrollments_per_user: i32,
    #[serde(default)]
    pub supports_navigation_gestures: bool,
    /// Sensor position for under-display sensors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SensorLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentInfo>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            strength: SensorStrength::default(),
            sensor_type: SensorType::default(),
            max_enrollments_per_user: default_max_enrollments(),
            supports_navigation_gestures: false,
            location: None,
            components: Vec::new(),
        }
    }
}

fn default_max_enrollments() -> i32 {
    5
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout handed to the driver's enroll call, in seconds
    #[serde(default = "default_enroll_timeout")]
    pub enroll_timeout_secs: u32,
    /// Template storage directory; `{user_id}` is substituted
    #[serde(default = "default_template_path")]
    pub template_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enroll_timeout_secs: default_enroll_timeout(),
            template_path: default_template_path(),
        }
    }
}

impl SessionConfig {
    /// Template directory for a user
    pub fn template_path_for(&self, user_id: i32) -> PathBuf {
        PathBuf::from(
            self.template_path
                .replace("{user_id}", &user_id.to_string()),
        )
    }
}

fn default_enroll_timeout() -> u32 {
    60
}

fn default_template_path() -> String {
    "/data/vendor_de/{user_id}/fpdata/".to_string()
}

// =============================================================================
// Lockout Configuration
// =============================================================================

/// Failure accounting thresholds for `FailedAttemptTracker`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Every this many consecutive failures starts a timed lockout
    #[serde(default = "default_timed_threshold")]
    pub timed_threshold: u32,
    /// Failures at which lockout becomes permanent
    #[serde(default = "default_permanent_threshold")]
    pub permanent_threshold: u32,
    /// Length of a timed lockout
    #[serde(default = "default_timed_duration")]
    pub timed_duration_ms: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            timed_threshold: default_timed_threshold(),
            permanent_threshold: default_permanent_threshold(),
            timed_duration_ms: default_timed_duration(),
        }
    }
}

fn default_timed_threshold() -> u32 {
    5
}

fn default_permanent_threshold() -> u32 {
    20
}

fn default_timed_duration() -> u64 {
    30_000
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Device backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    /// In-process simulated sensor
    Simulated(SimulatedConfig),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::Simulated(SimulatedConfig::default())
    }
}

/// Simulated sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedConfig {
    /// Time each blocking driver call takes
    #[serde(default)]
    pub latency_ms: u64,
    /// Touches needed to finish one enrollment
    #[serde(default = "default_enroll_samples")]
    pub enroll_samples: i32,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            enroll_samples: default_enroll_samples(),
        }
    }
}

fn default_enroll_samples() -> i32 {
    3
}

// =============================================================================
// Vendor Code Overrides
// =============================================================================

/// Vendor status code overrides
///
/// The built-in table follows the vendor numbering (hardware-unavailable
/// 7, lockout 8). Drivers that shift individual codes, such as those built
/// against the classic header, patch them here. Every field left unset keeps
/// the built-in value.
///
/// # Example
/// ```toml
/// [vendor_codes]
/// error_hw_unavailable = 1
/// error_lockout = 7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorCodeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_hw_unavailable: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_unable_to_process: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_timeout: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_no_space: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_canceled: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_unable_to_remove: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_lockout: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_vendor_base: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_good: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_partial: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_insufficient: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_imager_dirty: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_too_slow: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_too_fast: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_vendor_base: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = HalConfig::from_toml_str("").unwrap();
        assert_eq!(config.sensor.max_enrollments_per_user, 5);
        assert_eq!(config.session.enroll_timeout_secs, 60);
        assert_eq!(config.lockout.timed_threshold, 5);
        assert_eq!(config.lockout.permanent_threshold, 20);
        assert_eq!(config.lockout.timed_duration_ms, 30_000);
        assert!(matches!(config.device, DeviceConfig::Simulated(_)));
        assert!(config.vendor_codes.error_lockout.is_none());
    }

    #[test]
    fn test_parse_full_document() {
        let toml = r#"
[sensor]
sensor_id = 2
sensor_type = "power_button"
max_enrollments_per_user = 4

[session]
enroll_timeout_secs = 30

[lockout]
timed_threshold = 3
timed_duration_ms = 500

[device]
type = "simulated"
latency_ms = 10
enroll_samples = 2

[vendor_codes]
error_hw_unavailable = 7
error_lockout = 8
"#;
        let config = HalConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.sensor.sensor_id, 2);
        assert_eq!(config.sensor.sensor_type, SensorType::PowerButton);
        assert_eq!(config.session.enroll_timeout_secs, 30);
        assert_eq!(config.lockout.timed_threshold, 3);
        assert_eq!(config.lockout.permanent_threshold, 20);
        let DeviceConfig::Simulated(sim) = &config.device;
        assert_eq!(sim.latency_ms, 10);
        assert_eq!(sim.enroll_samples, 2);
        assert_eq!(config.vendor_codes.error_hw_unavailable, Some(7));
        assert_eq!(config.vendor_codes.error_lockout, Some(8));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\ntemplate_path = \"/tmp/fp/{{user_id}}\"").unwrap();

        let config = HalConfig::load(file.path()).unwrap();
        assert_eq!(
            config.session.template_path_for(10),
            PathBuf::from("/tmp/fp/10")
        );
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/fpd.toml");
        let config = HalConfig::load(path).unwrap();
        assert_eq!(config.sensor.location.unwrap().sensor_radius, 95);
        assert_eq!(config.vendor_codes.error_hw_unavailable, Some(1));
        assert_eq!(config.vendor_codes.error_lockout, Some(7));
    }

    #[test]
    fn test_load_missing_file() {
        let err = HalConfig::load("/nonexistent/fpd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_default_template_path() {
        let session = SessionConfig::default();
        assert_eq!(
            session.template_path_for(0),
            PathBuf::from("/data/vendor_de/0/fpdata/")
        );
    }
}
