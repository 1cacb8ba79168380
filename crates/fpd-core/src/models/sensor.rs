//! Sensor description and per-operation context

use serde::{Deserialize, Serialize};

/// Biometric strength class of a sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStrength {
    Convenience,
    Weak,
    #[default]
    Strong,
}

/// Physical form of a fingerprint sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Unknown,
    Rear,
    UnderDisplayUltrasonic,
    #[default]
    UnderDisplayOptical,
    PowerButton,
    HomeButton,
}

/// Where an under-display sensor sits on screen, in pixels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub sensor_location_x: i32,
    pub sensor_location_y: i32,
    pub sensor_radius: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display: String,
}

/// Version information for one hardware/software component of the sensor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub component_id: String,
    #[serde(default)]
    pub hardware_version: String,
    #[serde(default)]
    pub firmware_version: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub software_version: String,
}

/// Properties advertised for a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorProps {
    pub sensor_id: i32,
    pub sensor_strength: SensorStrength,
    pub max_enrollments_per_user: i32,
    pub sensor_type: SensorType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensor_locations: Vec<SensorLocation>,
    pub supports_navigation_gestures: bool,
    pub supports_detect_interaction: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_info: Vec<ComponentInfo>,
}

/// Caller-side context attached to enroll/authenticate/detect requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    pub id: i32,
    #[serde(default)]
    pub is_aod: bool,
    #[serde(default)]
    pub is_crypto: bool,
}

/// A touch on the sensor area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerContext {
    pub pointer_id: i32,
    pub x: f32,
    pub y: f32,
    pub minor: f32,
    pub major: f32,
    #[serde(default)]
    pub orientation: f32,
    #[serde(default)]
    pub is_aod: bool,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub gesture_start: i64,
}
