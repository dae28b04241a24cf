//! Seeded telemetry generation
//!
//! Produces reproducible `/status` payloads for the mock device. The same
//! seed gives the same sequence of readings, so a failing test can be
//! replayed exactly.
//!
//! # Example
//!
//! ```rust
//! use agriprobe_testkit::random::PseudoGenerator;
//!
//! let mut rng1 = PseudoGenerator::new(42);
//! let mut rng2 = PseudoGenerator::new(42);
//!
//! assert_eq!(rng1.reading(), rng2.reading());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

/// Alert thresholds used to classify generated readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub humidity_warning: f64,
    pub humidity_critical: f64,
    pub temperature_max: f64,
    pub soil_moisture_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            humidity_warning: 70.0,
            humidity_critical: 85.0,
            temperature_max: 35.0,
            soil_moisture_min: 30.0,
        }
    }
}

/// One set of sensor readings. `None` is a failed air sensor, reported as
/// `null` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature_air: Option<f64>,
    pub humidity_air: Option<f64>,
    pub temperature_soil: f64,
    pub soil_moisture: u32,
    pub battery_voltage: f64,
    pub battery_percent: u32,
    pub solar_charging: bool,
}

impl Reading {
    /// Alert level and reason, checked most severe first
    pub fn classify(&self, t: &Thresholds) -> (&'static str, &'static str) {
        let (Some(temperature), Some(humidity)) = (self.temperature_air, self.humidity_air) else {
            return ("RED", "Sensor failure");
        };
        let soil = f64::from(self.soil_moisture);
        if temperature > t.temperature_max {
            ("RED", "Heat stress")
        } else if humidity >= t.humidity_critical {
            ("RED", "Critical humidity - disease risk")
        } else if soil < t.soil_moisture_min {
            ("RED", "Severe drought")
        } else if humidity >= t.humidity_warning {
            ("ORANGE", "High humidity - monitor closely")
        } else if soil < t.soil_moisture_min + 10.0 {
            ("ORANGE", "Low soil moisture")
        } else if temperature > t.temperature_max - 5.0 {
            ("ORANGE", "High temperature")
        } else {
            ("GREEN", "Normal conditions")
        }
    }
}

/// Seeded pseudo-random generator for reproducible telemetry
#[derive(Debug)]
pub struct PseudoGenerator {
    rng: StdRng,
    seed: u64,
}

impl PseudoGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Readings in the ranges a field unit reports in a temperate season.
    /// The air sensor occasionally fails and yields no values.
    pub fn reading(&mut self) -> Reading {
        let battery_percent = self.rng.random_range(20..=100);
        let sensor_ok = self.rng.random_bool(1.0 - SENSOR_FAILURE_RATE);
        let temperature_air = round1(self.rng.random_range(15.0..38.0));
        let humidity_air = round1(self.rng.random_range(40.0..95.0));
        Reading {
            temperature_air: sensor_ok.then_some(temperature_air),
            humidity_air: sensor_ok.then_some(humidity_air),
            temperature_soil: round1(self.rng.random_range(12.0..28.0)),
            soil_moisture: self.rng.random_range(20..=80),
            battery_voltage: round2(3.3 + 0.9 * f64::from(battery_percent) / 100.0),
            battery_percent,
            solar_charging: self.rng.random_bool(0.5),
        }
    }

    /// A complete `/status` body for `device_id` at `timestamp`
    pub fn status_body(&mut self, device_id: &str, timestamp: u64, thresholds: &Thresholds) -> Value {
        let reading = self.reading();
        let (level, reason) = reading.classify(thresholds);
        json!({
            "device_id": device_id,
            "alert_level": level,
            "alert_reason": reason,
            "temperature_air": reading.temperature_air,
            "humidity_air": reading.humidity_air,
            "temperature_soil": reading.temperature_soil,
            "soil_moisture": reading.soil_moisture,
            "battery_voltage": reading.battery_voltage,
            "battery_percent": reading.battery_percent,
            "solar_charging": reading.solar_charging,
            "timestamp": timestamp,
        })
    }
}

/// Chance that one sample comes back with a failed air sensor
const SENSOR_FAILURE_RATE: f64 = 0.02;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut rng1 = PseudoGenerator::new(12345);
        let mut rng2 = PseudoGenerator::new(12345);

        for _ in 0..20 {
            assert_eq!(rng1.reading(), rng2.reading());
        }
    }

    #[test]
    fn test_different_seeds_different_output() {
        let mut rng1 = PseudoGenerator::new(1);
        let mut rng2 = PseudoGenerator::new(2);

        let a: Vec<_> = (0..5).map(|_| rng1.reading()).collect();
        let b: Vec<_> = (0..5).map(|_| rng2.reading()).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_readings_in_range() {
        let mut rng = PseudoGenerator::new(7);
        for _ in 0..200 {
            let r = rng.reading();
            assert_eq!(r.temperature_air.is_some(), r.humidity_air.is_some());
            if let Some(t) = r.temperature_air {
                assert!((15.0..=38.0).contains(&t));
            }
            assert!((20..=80).contains(&r.soil_moisture));
            assert!((3.3..=4.2).contains(&r.battery_voltage));
        }
    }

    #[test]
    fn test_classify() {
        let t = Thresholds::default();
        let mut r = Reading {
            temperature_air: Some(24.5),
            humidity_air: Some(60.0),
            temperature_soil: 22.3,
            soil_moisture: 50,
            battery_voltage: 3.92,
            battery_percent: 85,
            solar_charging: true,
        };
        assert_eq!(r.classify(&t).0, "GREEN");

        r.humidity_air = Some(72.0);
        assert_eq!(r.classify(&t), ("ORANGE", "High humidity - monitor closely"));

        r.soil_moisture = 25;
        assert_eq!(r.classify(&t), ("RED", "Severe drought"));

        r.temperature_air = Some(36.0);
        assert_eq!(r.classify(&t), ("RED", "Heat stress"));

        // a dead sensor outranks every threshold
        r.humidity_air = None;
        assert_eq!(r.classify(&t), ("RED", "Sensor failure"));
    }

    #[test]
    fn test_sensor_failure_serializes_as_null() {
        let mut rng = PseudoGenerator::new(3);
        let failed = (0..2000)
            .map(|i| rng.status_body("AS-001-237", i, &Thresholds::default()))
            .find(|body| body["temperature_air"].is_null())
            .expect("a failed sensor within 2000 samples");
        assert!(failed["humidity_air"].is_null());
        assert_eq!(failed["alert_level"], "RED");
        assert_eq!(failed["alert_reason"], "Sensor failure");
    }

    #[test]
    fn test_status_body_shape() {
        let mut rng = PseudoGenerator::new(42);
        let body = rng.status_body("AS-001-237", 1_718_000_000, &Thresholds::default());
        assert_eq!(body["device_id"], "AS-001-237");
        assert_eq!(body["timestamp"], 1_718_000_000u64);
        assert!(["GREEN", "ORANGE", "RED"].contains(&body["alert_level"].as_str().unwrap()));
        assert!(body["solar_charging"].is_boolean());
    }
}
