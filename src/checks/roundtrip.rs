//! Config Round-Trip Check
//!
//! Proves that configuration writes are applied and read back, and puts the
//! original configuration back afterwards.
//!
//! ## Stages
//!
//! 1. **Fetching**: read the current configuration. Nothing is written if
//!    this fails, or if the device already runs the sentinel profile.
//! 2. **Submitting**: POST the sentinel configuration and require a
//!    `CONFIG_APPLIED` acknowledgment, then wait the settle delay.
//! 3. **Verifying**: read the configuration again; the profile id must be
//!    the sentinel.
//! 4. **Restoring**: POST the original configuration and read it back. Runs
//!    whenever stage 1 succeeded, whatever happened in stages 2 and 3,
//!    including a timeout or an interrupt.
//!
//! The verdict covers stages 1-3. The restore outcome is tracked on its own:
//! a failed restore leaves the device in the sentinel configuration, which
//! the result reports as a hazard even when the verdict is a pass.
//!
//! ## Options
//!
//! - `timeout`: Maximum time for stages 1-3 (default: 1m). The restore
//!   always runs after it, bounded by the per-request timeout.
//! - `settle_delay_ms`: Wait after the write before verifying (default: 1000)
//! - `sentinel_profile`: Profile id of the synthetic configuration
//!   (default: `TEST_PROFILE`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::read_config;
use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult, FailureKind};
use crate::client::{DeviceClient, DeviceConfig};
use crate::shutdown::{expired, interrupted};

/// Default wait between the write and the verification read
const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Stage of the round-trip protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundTripStage {
    Fetching,
    Submitting,
    Verifying,
    Restoring,
}

impl std::fmt::Display for RoundTripStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundTripStage::Fetching => write!(f, "fetching"),
            RoundTripStage::Submitting => write!(f, "submitting"),
            RoundTripStage::Verifying => write!(f, "verifying"),
            RoundTripStage::Restoring => write!(f, "restoring"),
        }
    }
}

/// Verdict of stages 1-3
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum RoundTripVerdict {
    Passed,
    Failed {
        stage: RoundTripStage,
        kind: FailureKind,
        reason: String,
    },
}

impl RoundTripVerdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, RoundTripVerdict::Passed)
    }

    fn failed(stage: RoundTripStage, error: &CheckError) -> Self {
        RoundTripVerdict::Failed {
            stage,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Outcome of stage 4
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "restore", content = "reason", rename_all = "snake_case")]
pub enum RestoreOutcome {
    /// The original configuration was never read, so there was nothing to restore
    NotAttempted,
    /// The original configuration was written and read back
    Restored,
    /// The device may still be running the sentinel configuration
    Failed(String),
}

impl RestoreOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RestoreOutcome::Failed(_))
    }
}

/// Everything the controller observed during one round-trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTripReport {
    pub verdict: RoundTripVerdict,
    pub restore: RestoreOutcome,
    /// Configuration read in stage 1
    pub original: Option<DeviceConfig>,
    /// Sentinel configuration submitted in stage 2
    pub submitted: DeviceConfig,
}

/// Drives the fetch / submit / verify / restore protocol against one device
pub struct ConfigRoundTrip<'a> {
    device: &'a DeviceClient,
    sentinel: DeviceConfig,
    settle_delay: Duration,
    budget: Option<Duration>,
    shutdown: watch::Receiver<bool>,
}

/// How far stages 1-3 got before they ended or were cut short
struct Progress {
    stage: RoundTripStage,
    original: Option<DeviceConfig>,
}

impl<'a> ConfigRoundTrip<'a> {
    pub fn new(device: &'a DeviceClient) -> Self {
        Self {
            device,
            sentinel: DeviceConfig::sentinel(DeviceConfig::SENTINEL_PROFILE),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            budget: None,
            shutdown: crate::shutdown::never(),
        }
    }

    pub fn with_sentinel_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.sentinel = DeviceConfig::sentinel(profile_id);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Time allowed for stages 1-3; the restore runs after it regardless
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    /// Stop stages 1-3 early when `shutdown` flips; the restore still runs
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(&self) -> RoundTripReport {
        let mut progress = Progress {
            stage: RoundTripStage::Fetching,
            original: None,
        };
        let mut shutdown = self.shutdown.clone();

        let outcome = tokio::select! {
            outcome = self.advance(&mut progress) => outcome,
            limit = expired(self.budget) => Err(CheckError::Timeout(limit)),
            _ = interrupted(&mut shutdown) => Err(CheckError::Interrupted),
        };

        let verdict = match outcome {
            Ok(()) => RoundTripVerdict::Passed,
            Err(e) => {
                warn!(stage = %progress.stage, error = %e, "Round-trip failed");
                RoundTripVerdict::failed(progress.stage, &e)
            }
        };

        let Some(original) = progress.original else {
            return RoundTripReport {
                verdict,
                restore: RestoreOutcome::NotAttempted,
                original: None,
                submitted: self.sentinel.clone(),
            };
        };

        info!(
            stage = %RoundTripStage::Restoring,
            profile = %original.crop_profile_id,
            "Restoring original configuration"
        );
        let restore = match self.restore(&original).await {
            Ok(()) => RestoreOutcome::Restored,
            Err(e) => {
                error!(
                    error = %e,
                    profile = %original.crop_profile_id,
                    "Restore failed, device may still run the test configuration"
                );
                RestoreOutcome::Failed(e.to_string())
            }
        };

        RoundTripReport {
            verdict,
            restore,
            original: Some(original),
            submitted: self.sentinel.clone(),
        }
    }

    /// Stages 1-3. `progress.original` is set before the first write, so a
    /// caller that abandons this future still knows what to restore.
    async fn advance(&self, progress: &mut Progress) -> Result<(), CheckError> {
        info!(stage = %RoundTripStage::Fetching, "Reading current configuration");
        let original = read_config(self.device).await?;
        if original.crop_profile_id == self.sentinel.crop_profile_id {
            return Err(CheckError::Semantic(format!(
                "device already runs {:?}, a write of the test profile would prove nothing; \
                 restore the device or pick another sentinel_profile",
                original.crop_profile_id
            )));
        }
        debug!(profile = %original.crop_profile_id, "Captured original configuration");
        progress.original = Some(original);

        progress.stage = RoundTripStage::Submitting;
        info!(
            stage = %progress.stage,
            profile = %self.sentinel.crop_profile_id,
            "Submitting test configuration"
        );
        self.apply(&self.sentinel).await?;

        if !self.settle_delay.is_zero() {
            debug!(delay_ms = self.settle_delay.as_millis(), "Waiting for device to settle");
            tokio::time::sleep(self.settle_delay).await;
        }

        progress.stage = RoundTripStage::Verifying;
        info!(stage = %progress.stage, "Reading configuration back");
        self.expect_profile(&self.sentinel.crop_profile_id).await
    }

    async fn restore(&self, original: &DeviceConfig) -> Result<(), CheckError> {
        self.apply(original).await?;
        self.expect_profile(&original.crop_profile_id).await
    }

    async fn apply(&self, config: &DeviceConfig) -> Result<(), CheckError> {
        let ack = self.device.apply_config(config).await?;
        if ack.is_applied() {
            Ok(())
        } else {
            Err(CheckError::Semantic(format!(
                "config write acknowledged with status {:?}, expected {:?}",
                ack.status,
                crate::client::ConfigApplyResponse::APPLIED
            )))
        }
    }

    async fn expect_profile(&self, expected: &str) -> Result<(), CheckError> {
        let current = read_config(self.device).await?;
        if current.crop_profile_id == expected {
            Ok(())
        } else {
            Err(CheckError::Semantic(format!(
                "crop_profile_id is {:?}, expected {:?}",
                current.crop_profile_id, expected
            )))
        }
    }
}

pub struct ConfigRoundTripCheck;

#[async_trait]
impl Check for ConfigRoundTripCheck {
    fn name(&self) -> &'static str {
        "config-roundtrip"
    }

    fn title(&self) -> &'static str {
        "Config POST"
    }

    fn description(&self) -> &'static str {
        "Write a test configuration, read it back, restore the original"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();
        let settle_delay_ms: u64 = opts
            .get_extra("settle_delay_ms")
            .unwrap_or(DEFAULT_SETTLE_DELAY_MS);

        let mut controller = ConfigRoundTrip::new(&ctx.device)
            .with_settle_delay(Duration::from_millis(settle_delay_ms))
            .with_budget(opts.timeout)
            .with_shutdown(ctx.shutdown.clone());
        if let Some(profile) = opts.get_extra::<String>("sentinel_profile") {
            if profile.trim().is_empty() {
                return Err(CheckError::Config(
                    "sentinel_profile must not be empty".to_string(),
                ));
            }
            controller = controller.with_sentinel_profile(profile);
        }

        let report = controller.run().await;
        Ok(to_check_result(self.name(), &report, start.elapsed()))
    }

    fn cancel_safe(&self) -> bool {
        false
    }

    fn default_options(&self) -> CheckOptions {
        CheckOptions {
            timeout: Some(Duration::from_secs(60)),
            extra: HashMap::new(),
        }
    }
}

fn to_check_result(name: &str, report: &RoundTripReport, duration: Duration) -> CheckResult {
    let mut result = match &report.verdict {
        RoundTripVerdict::Passed => CheckResult::passed(name, duration).with_message(format!(
            "{} applied and verified",
            report.submitted.crop_profile_id
        )),
        RoundTripVerdict::Failed {
            stage,
            kind,
            reason,
        } => CheckResult {
            passed: false,
            failure: Some(*kind),
            ..CheckResult::passed(name, duration)
        }
        .with_diagnostic(format!("{stage}: {reason}"))
        .with_message(format!("failed while {stage}")),
    };

    result = result.with_detail("restore", &report.restore);
    if let Some(original) = &report.original {
        result = result.with_detail("original_profile", &original.crop_profile_id);
    }

    if let RestoreOutcome::Failed(reason) = &report.restore {
        result = result
            .with_diagnostic(format!("restore: {reason}"))
            .with_hazard(format!(
                "original configuration ({}) was not restored; device may still run {}",
                report
                    .original
                    .as_ref()
                    .map_or("unknown", |c| c.crop_profile_id.as_str()),
                report.submitted.crop_profile_id
            ));
    }

    result
}
