//! Continuous monitor
//!
//! Polls `GET /status` at a fixed interval for a bounded duration and emits
//! one event per sample. Errors are emitted and the loop carries on. The
//! loop ends when the duration elapses or the shutdown channel flips;
//! shutdown is raced against both the request and the wait, so it takes
//! effect within one interval.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{DeviceClient, StatusSnapshot};
use crate::shutdown::interrupted;

/// Default total monitoring time
pub const DEFAULT_MONITOR_DURATION: Duration = Duration::from_secs(30);

/// Default wait between samples
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    pub duration: Duration,
    pub interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_MONITOR_DURATION,
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// One observation made by the monitor
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Sample {
        at: DateTime<Local>,
        snapshot: StatusSnapshot,
    },
    Error {
        at: DateTime<Local>,
        message: String,
    },
}

impl MonitorEvent {
    /// Console line for this event
    pub fn to_line(&self) -> String {
        match self {
            MonitorEvent::Sample { at, snapshot } => format!(
                "[{}] Temp: {}°C | Humidity: {}% | Soil: {}% | Alert: {} | Battery: {}V ({}%)",
                at.format("%H:%M:%S"),
                reading(snapshot.temperature_air, 1),
                reading(snapshot.humidity_air, 0),
                reading(snapshot.soil_moisture, 0),
                snapshot.alert_level,
                reading(snapshot.battery_voltage, 2),
                reading(snapshot.battery_percent, 0),
            ),
            MonitorEvent::Error { at, message } => {
                format!("[{}] Error: {}", at.format("%H:%M:%S"), message)
            }
        }
    }
}

/// A reading at `precision` decimals, `n/a` when the sensor reported nothing
fn reading(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

/// Why the monitor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    /// The configured duration elapsed
    Completed,
    /// The shutdown signal was received
    Interrupted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::Interrupted => write!(f, "interrupted by user"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    pub samples: usize,
    pub errors: usize,
    pub termination: Termination,
    pub elapsed: Duration,
}

/// Bounded status polling loop
pub struct Monitor<'a> {
    device: &'a DeviceClient,
    options: MonitorOptions,
}

impl<'a> Monitor<'a> {
    pub fn new(device: &'a DeviceClient, options: MonitorOptions) -> Self {
        Self { device, options }
    }

    /// Poll until the duration elapses or `shutdown` becomes `true`
    ///
    /// A dropped shutdown sender is treated as "never interrupt".
    pub async fn run<F>(&self, mut shutdown: watch::Receiver<bool>, mut emit: F) -> MonitorSummary
    where
        F: FnMut(&MonitorEvent),
    {
        let start = Instant::now();
        let mut samples = 0usize;
        let mut errors = 0usize;

        info!(
            device = %self.device.label(),
            duration_secs = self.options.duration.as_secs_f64(),
            interval_ms = self.options.interval.as_millis(),
            "Starting continuous monitoring"
        );

        let termination = loop {
            if *shutdown.borrow() {
                break Termination::Interrupted;
            }
            if start.elapsed() >= self.options.duration {
                break Termination::Completed;
            }

            let outcome = tokio::select! {
                outcome = self.device.status() => outcome,
                _ = interrupted(&mut shutdown) => break Termination::Interrupted,
            };

            let event = match outcome {
                Ok(snapshot) => {
                    samples += 1;
                    debug!(sample = samples, alert = %snapshot.alert_level, "Status sample");
                    MonitorEvent::Sample {
                        at: Local::now(),
                        snapshot,
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!(error = %e, "Status sample failed");
                    MonitorEvent::Error {
                        at: Local::now(),
                        message: e.to_string(),
                    }
                }
            };
            emit(&event);

            tokio::select! {
                _ = tokio::time::sleep(self.options.interval) => {}
                _ = interrupted(&mut shutdown) => break Termination::Interrupted,
            }
        };

        let summary = MonitorSummary {
            samples,
            errors,
            termination,
            elapsed: start.elapsed(),
        };
        info!(
            samples = summary.samples,
            errors = summary.errors,
            termination = %summary.termination,
            "Continuous monitoring finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AlertLevel;
    use chrono::TimeZone;

    fn snapshot() -> StatusSnapshot {
        serde_json::from_value(serde_json::json!({
            "device_id": "AS-001-237",
            "alert_level": "ORANGE",
            "temperature_air": 24.46,
            "humidity_air": 68.4,
            "soil_moisture": 41,
            "battery_voltage": 3.9234,
            "battery_percent": 85,
            "solar_charging": true,
            "timestamp": 1_718_000_000
        }))
        .unwrap()
    }

    #[test]
    fn test_sample_line_format() {
        let at = Local.with_ymd_and_hms(2024, 6, 1, 14, 3, 9).unwrap();
        let line = MonitorEvent::Sample {
            at,
            snapshot: snapshot(),
        }
        .to_line();
        assert_eq!(
            line,
            "[14:03:09] Temp: 24.5°C | Humidity: 68% | Soil: 41% | Alert: ORANGE | Battery: 3.92V (85%)"
        );
    }

    #[test]
    fn test_sample_line_with_failed_sensor() {
        let at = Local.with_ymd_and_hms(2024, 6, 1, 14, 3, 9).unwrap();
        let mut snapshot = snapshot();
        snapshot.temperature_air = None;
        snapshot.humidity_air = None;
        snapshot.alert_level = AlertLevel::Red;
        let line = MonitorEvent::Sample { at, snapshot }.to_line();
        assert_eq!(
            line,
            "[14:03:09] Temp: n/a°C | Humidity: n/a% | Soil: 41% | Alert: RED | Battery: 3.92V (85%)"
        );
    }

    #[test]
    fn test_error_line_format() {
        let at = Local.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let line = MonitorEvent::Error {
            at,
            message: "status returned HTTP 500 Internal Server Error".into(),
        }
        .to_line();
        assert_eq!(
            line,
            "[09:00:00] Error: status returned HTTP 500 Internal Server Error"
        );
    }

    #[test]
    fn test_snapshot_alert() {
        assert_eq!(snapshot().alert_level, AlertLevel::Orange);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Completed.to_string(), "completed");
        assert_eq!(Termination::Interrupted.to_string(), "interrupted by user");
    }

    #[tokio::test]
    async fn test_already_interrupted_takes_no_samples() {
        let device = DeviceClient::new("http://127.0.0.1:9").unwrap();
        let (_tx, rx) = watch::channel(true);
        let mut events = 0;
        let summary = Monitor::new(&device, MonitorOptions::default())
            .run(rx, |_| events += 1)
            .await;
        assert_eq!(summary.termination, Termination::Interrupted);
        assert_eq!(summary.samples, 0);
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn test_zero_duration_completes_immediately() {
        let device = DeviceClient::new("http://127.0.0.1:9").unwrap();
        let (_tx, rx) = watch::channel(false);
        let options = MonitorOptions {
            duration: Duration::ZERO,
            interval: Duration::from_millis(10),
        };
        let summary = Monitor::new(&device, options).run(rx, |_| {}).await;
        assert_eq!(summary.termination, Termination::Completed);
        assert_eq!(summary.samples + summary.errors, 0);
    }
}
