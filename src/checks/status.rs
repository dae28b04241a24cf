//! Status Check
//!
//! Validates the live telemetry snapshot at `GET /status`.
//!
//! ## What it checks
//!
//! 1. All required telemetry fields are present (identity, alert level,
//!    air temperature, air humidity, soil moisture, battery voltage,
//!    battery percent, solar charging flag, timestamp)
//! 2. `alert_level` is one of `GREEN`, `ORANGE`, `RED`
//!
//! The closed-set alert level is enforced by the [`AlertLevel`] decoder, so
//! any other label (`BLUE`, `green`, ...) fails as a semantic error.
//!
//! [`AlertLevel`]: crate::client::AlertLevel

use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult};

pub struct StatusCheck;

#[async_trait]
impl Check for StatusCheck {
    fn name(&self) -> &'static str {
        "status"
    }

    fn title(&self) -> &'static str {
        "Status Check"
    }

    fn description(&self) -> &'static str {
        "Telemetry snapshot is complete and alert level is GREEN/ORANGE/RED"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        _opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();

        match ctx.device.status().await {
            Ok(snapshot) => {
                info!(
                    device_id = %snapshot.device_id,
                    alert = %snapshot.alert_level,
                    temperature = ?snapshot.temperature_air,
                    humidity = ?snapshot.humidity_air,
                    soil = ?snapshot.soil_moisture,
                    reason = ?snapshot.alert_reason,
                    "Status check passed"
                );
                let message = format!(
                    "{} reports {}",
                    snapshot.device_id, snapshot.alert_level
                );
                Ok(CheckResult::passed(self.name(), start.elapsed())
                    .with_detail("snapshot", &snapshot)
                    .with_message(message))
            }
            Err(e) => {
                let e = CheckError::from(e);
                warn!(error = %e, kind = %e.kind(), "Status check failed");
                Ok(CheckResult::failed(self.name(), &e, start.elapsed()))
            }
        }
    }
}
