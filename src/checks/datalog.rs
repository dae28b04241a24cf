//! Data Log Check
//!
//! Reads the historical log at `GET /data/log`.
//!
//! A 404 means no record has been written yet (normal right after first
//! boot) and passes. A 200 must be a JSON object; its record count, device
//! id and latest record are reported without further field validation.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult};

pub struct DataLogCheck;

#[async_trait]
impl Check for DataLogCheck {
    fn name(&self) -> &'static str {
        "datalog"
    }

    fn title(&self) -> &'static str {
        "Data Log"
    }

    fn description(&self) -> &'static str {
        "Historical log is readable (absent log on first boot is accepted)"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        _opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();

        match ctx.device.data_log().await {
            Ok(None) => {
                info!("No data log found (expected on first boot)");
                Ok(CheckResult::passed(self.name(), start.elapsed())
                    .with_detail("present", false)
                    .with_message("no data log yet"))
            }
            Ok(Some(log)) => {
                info!(
                    records = log.records.len(),
                    device_id = ?log.device_id(),
                    "Data log check passed"
                );
                let mut result = CheckResult::passed(self.name(), start.elapsed())
                    .with_detail("present", true)
                    .with_detail("record_count", log.records.len())
                    .with_message(format!("{} records", log.records.len()));
                if let Some(device_id) = log.device_id() {
                    result = result.with_detail("device_id", device_id);
                }
                if let Some(latest) = log.latest() {
                    result = result.with_detail("latest_record", latest);
                }
                Ok(result)
            }
            Err(e) => {
                let e = CheckError::from(e);
                warn!(error = %e, "Data log check failed");
                Ok(CheckResult::failed(self.name(), &e, start.elapsed()))
            }
        }
    }
}
