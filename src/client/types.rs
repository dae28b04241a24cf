//! Device API types
//!
//! Typed forms of the AgriShield REST payloads. Presence of required fields
//! is enforced by the [`EndpointContract`](super::EndpointContract) check
//! before decoding. Sensor readings are `Option` because a failed sensor is
//! reported as `null` while the key stays present.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Health summary
/// Endpoint: GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall state, `"OK"` when healthy
    pub status: String,
    /// Milliseconds since boot; some firmware builds report a float
    pub uptime_ms: f64,
    /// Firmware version string
    pub firmware_version: String,
}

impl HealthResponse {
    /// Sentinel the device reports when healthy
    pub const OK: &'static str = "OK";

    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }
}

/// Liveness acknowledgment
/// Endpoint: GET /ping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub pong: bool,
}

/// Three-tier alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Green,
    Orange,
    Red,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Green => write!(f, "GREEN"),
            AlertLevel::Orange => write!(f, "ORANGE"),
            AlertLevel::Red => write!(f, "RED"),
        }
    }
}

/// Live telemetry snapshot
/// Endpoint: GET /status (also the shape of data log records)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub device_id: String,
    pub alert_level: AlertLevel,
    /// Air temperature in °C, `None` on sensor failure
    pub temperature_air: Option<f64>,
    /// Relative air humidity in %, `None` on sensor failure
    pub humidity_air: Option<f64>,
    /// Soil moisture in %
    pub soil_moisture: Option<f64>,
    /// Battery voltage in V
    pub battery_voltage: Option<f64>,
    /// Battery charge in %
    pub battery_percent: Option<f64>,
    pub solar_charging: bool,
    /// Device clock; firmware builds differ between epoch numbers and strings
    pub timestamp: Value,
    /// Soil temperature in °C, when the probe is fitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_soil: Option<f64>,
    /// Human-readable reason for the current alert level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_reason: Option<String>,
}

/// Historical log
/// Endpoint: GET /data/log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataLog {
    #[serde(default)]
    pub device_info: Map<String, Value>,
    #[serde(default)]
    pub records: Vec<Value>,
}

impl DataLog {
    pub fn device_id(&self) -> Option<&str> {
        self.device_info.get("device_id").and_then(Value::as_str)
    }

    /// Most recent record (records are appended in time order)
    pub fn latest(&self) -> Option<&Value> {
        self.records.last()
    }
}

/// Mutable operating parameters of the device
/// Endpoint: GET /config, POST /config
///
/// Threshold values are kept as raw JSON numbers and unknown top-level keys
/// are carried in `extra`, so a configuration read from the device can be
/// written back without altering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub crop_profile_id: String,
    pub sampling_interval_minutes: u32,
    pub alert_thresholds: IndexMap<String, Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceConfig {
    /// Profile id used for the synthetic round-trip configuration
    pub const SENTINEL_PROFILE: &'static str = "TEST_PROFILE";

    /// Synthetic configuration submitted by the round-trip check
    ///
    /// Not a real crop profile; it only proves that writes are read back.
    pub fn sentinel(profile_id: impl Into<String>) -> Self {
        let thresholds = [
            ("humidity_warning", 75),
            ("humidity_critical", 90),
            ("temperature_max", 32),
            ("soil_moisture_min", 35),
            ("soil_moisture_max", 75),
        ];

        Self {
            crop_profile_id: profile_id.into(),
            sampling_interval_minutes: 30,
            alert_thresholds: thresholds
                .into_iter()
                .map(|(name, value)| (name.to_string(), Number::from(value)))
                .collect(),
            extra: Map::new(),
        }
    }
}

/// Acknowledgment of a configuration write
/// Endpoint: POST /config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigApplyResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConfigApplyResponse {
    /// Status the device reports once a configuration is applied
    pub const APPLIED: &'static str = "CONFIG_APPLIED";

    pub fn is_applied(&self) -> bool {
        self.status == Self::APPLIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_body(alert: &str) -> Value {
        json!({
            "device_id": "AS-001-237",
            "alert_level": alert,
            "temperature_air": 24.5,
            "humidity_air": 68.0,
            "soil_moisture": 41,
            "battery_voltage": 3.92,
            "battery_percent": 85,
            "solar_charging": true,
            "timestamp": 1_718_000_000
        })
    }

    #[test]
    fn test_alert_levels_decode() {
        for (raw, level) in [
            ("GREEN", AlertLevel::Green),
            ("ORANGE", AlertLevel::Orange),
            ("RED", AlertLevel::Red),
        ] {
            let snapshot: StatusSnapshot = serde_json::from_value(status_body(raw)).unwrap();
            assert_eq!(snapshot.alert_level, level);
            assert_eq!(snapshot.alert_level.to_string(), raw);
        }
    }

    #[test]
    fn test_unknown_alert_level_rejected() {
        let err = serde_json::from_value::<StatusSnapshot>(status_body("BLUE")).unwrap_err();
        assert!(err.to_string().contains("BLUE"));
    }

    #[test]
    fn test_lowercase_alert_level_rejected() {
        assert!(serde_json::from_value::<StatusSnapshot>(status_body("green")).is_err());
    }

    #[test]
    fn test_alert_level_ordering() {
        assert!(AlertLevel::Green < AlertLevel::Orange);
        assert!(AlertLevel::Orange < AlertLevel::Red);
    }

    #[test]
    fn test_null_reading_decodes_as_none() {
        let mut body = status_body("RED");
        body["temperature_air"] = Value::Null;
        body["alert_reason"] = json!("Sensor failure");
        let snapshot: StatusSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.temperature_air, None);
        assert_eq!(snapshot.humidity_air, Some(68.0));
        assert_eq!(snapshot.alert_level, AlertLevel::Red);
    }

    #[test]
    fn test_string_reading_rejected() {
        let mut body = status_body("GREEN");
        body["soil_moisture"] = json!("41%");
        assert!(serde_json::from_value::<StatusSnapshot>(body).is_err());
    }

    #[test]
    fn test_float_uptime_accepted() {
        let health: HealthResponse = serde_json::from_value(json!({
            "status": "OK",
            "uptime_ms": 123456.5,
            "firmware_version": "1.2.0"
        }))
        .unwrap();
        assert!(health.is_ok());
        assert_eq!(health.uptime_ms, 123456.5);
    }

    #[test]
    fn test_optional_status_fields() {
        let mut body = status_body("ORANGE");
        body["temperature_soil"] = json!(22.3);
        body["alert_reason"] = json!("High humidity - monitor closely");
        let snapshot: StatusSnapshot = serde_json::from_value(body).unwrap();
        assert_eq!(snapshot.temperature_soil, Some(22.3));
        assert_eq!(
            snapshot.alert_reason.as_deref(),
            Some("High humidity - monitor closely")
        );
    }

    #[test]
    fn test_config_preserves_numbers_and_extra_fields() {
        let body = json!({
            "crop_profile_id": "CORN_V1",
            "sampling_interval_minutes": 15,
            "alert_thresholds": {
                "humidity_warning": 70,
                "humidity_critical": 85,
                "temperature_max": 35.5
            },
            "device_name": "north-field"
        });

        let config: DeviceConfig = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(config.crop_profile_id, "CORN_V1");
        assert_eq!(config.extra.get("device_name"), Some(&json!("north-field")));
        assert_eq!(serde_json::to_value(&config).unwrap(), body);
    }

    #[test]
    fn test_sentinel_config() {
        let config = DeviceConfig::sentinel(DeviceConfig::SENTINEL_PROFILE);
        let body = serde_json::to_value(&config).unwrap();
        assert_eq!(
            body,
            json!({
                "crop_profile_id": "TEST_PROFILE",
                "sampling_interval_minutes": 30,
                "alert_thresholds": {
                    "humidity_warning": 75,
                    "humidity_critical": 90,
                    "temperature_max": 32,
                    "soil_moisture_min": 35,
                    "soil_moisture_max": 75
                }
            })
        );
    }

    #[test]
    fn test_data_log_helpers() {
        let log: DataLog = serde_json::from_value(json!({
            "device_info": {"device_id": "AS-001-237"},
            "records": [{"seq": 1}, {"seq": 2}]
        }))
        .unwrap();
        assert_eq!(log.device_id(), Some("AS-001-237"));
        assert_eq!(log.latest(), Some(&json!({"seq": 2})));

        let empty: DataLog = serde_json::from_value(json!({})).unwrap();
        assert!(empty.latest().is_none());
        assert!(empty.device_id().is_none());
    }

    #[test]
    fn test_apply_ack() {
        let ack: ConfigApplyResponse =
            serde_json::from_value(json!({"status": "CONFIG_APPLIED"})).unwrap();
        assert!(ack.is_applied());
        let nack: ConfigApplyResponse =
            serde_json::from_value(json!({"status": "REJECTED", "message": "bad profile"}))
                .unwrap();
        assert!(!nack.is_applied());
    }
}
