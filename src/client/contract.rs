//! Endpoint contracts
//!
//! One immutable contract per device endpoint. A contract names the path and
//! method and lists the top-level fields a response body must carry before
//! it is decoded into its typed form.

use reqwest::Method;
use serde_json::Value;

/// Shape of a single device endpoint
#[derive(Debug, Clone)]
pub struct EndpointContract {
    /// Short name used in logs and diagnostics
    pub name: &'static str,
    /// HTTP method
    pub method: Method,
    /// Path relative to the device base URL (no leading slash)
    pub path: &'static str,
    /// Top-level fields that must be present in the response body
    pub required: &'static [&'static str],
}

impl EndpointContract {
    /// Fields from `required` that are absent from `body`
    ///
    /// A body that is not a JSON object is missing every required field.
    pub fn missing_fields(&self, body: &Value) -> Vec<&'static str> {
        match body.as_object() {
            Some(map) => self
                .required
                .iter()
                .copied()
                .filter(|field| !map.contains_key(*field))
                .collect(),
            None => self.required.to_vec(),
        }
    }

    /// `METHOD /path`, for log lines
    pub fn route(&self) -> String {
        format!("{} /{}", self.method, self.path)
    }
}

/// GET /health
pub static HEALTH: EndpointContract = EndpointContract {
    name: "health",
    method: Method::GET,
    path: "health",
    required: &["status", "uptime_ms", "firmware_version"],
};

/// GET /ping
pub static PING: EndpointContract = EndpointContract {
    name: "ping",
    method: Method::GET,
    path: "ping",
    required: &["pong"],
};

/// GET /status
pub static STATUS: EndpointContract = EndpointContract {
    name: "status",
    method: Method::GET,
    path: "status",
    required: &[
        "device_id",
        "alert_level",
        "temperature_air",
        "humidity_air",
        "soil_moisture",
        "battery_voltage",
        "battery_percent",
        "solar_charging",
        "timestamp",
    ],
};

/// GET /data/log
///
/// Records are not validated field by field; the log only has to be an object.
pub static DATA_LOG: EndpointContract = EndpointContract {
    name: "data log",
    method: Method::GET,
    path: "data/log",
    required: &[],
};

/// GET /config
pub static CONFIG: EndpointContract = EndpointContract {
    name: "config",
    method: Method::GET,
    path: "config",
    required: &[
        "crop_profile_id",
        "sampling_interval_minutes",
        "alert_thresholds",
    ],
};

/// POST /config
pub static CONFIG_APPLY: EndpointContract = EndpointContract {
    name: "config apply",
    method: Method::POST,
    path: "config",
    required: &["status"],
};
