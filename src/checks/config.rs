//! Config Read Check
//!
//! Validates `GET /config` and exposes [`read_config`], which the round-trip
//! check reuses for its fetch and verify steps.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult};
use crate::client::{DeviceClient, DeviceConfig};

/// Fetch and decode the device configuration
///
/// Fails if the request errors or any of `crop_profile_id`,
/// `sampling_interval_minutes`, `alert_thresholds` is absent.
pub async fn read_config(device: &DeviceClient) -> Result<DeviceConfig, CheckError> {
    let config = device.config().await?;
    debug!(
        profile = %config.crop_profile_id,
        interval_min = config.sampling_interval_minutes,
        thresholds = config.alert_thresholds.len(),
        "Read device configuration"
    );
    Ok(config)
}

pub struct ConfigReadCheck;

#[async_trait]
impl Check for ConfigReadCheck {
    fn name(&self) -> &'static str {
        "config"
    }

    fn title(&self) -> &'static str {
        "Config GET"
    }

    fn description(&self) -> &'static str {
        "Configuration carries profile id, sampling interval and thresholds"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        _opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();

        match read_config(&ctx.device).await {
            Ok(config) => {
                info!(profile = %config.crop_profile_id, "Config read check passed");
                Ok(CheckResult::passed(self.name(), start.elapsed())
                    .with_message(format!("profile {}", config.crop_profile_id))
                    .with_detail("config", &config))
            }
            Err(e) => {
                warn!(error = %e, "Config read check failed");
                Ok(CheckResult::failed(self.name(), &e, start.elapsed()))
            }
        }
    }
}
