//! Health Check
//!
//! Validates the liveness summary at `GET /health`.
//!
//! ## What it checks
//!
//! 1. The body carries `status`, `uptime_ms` and `firmware_version`
//! 2. `status` equals the `"OK"` sentinel

use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult};
use crate::client::HealthResponse;

/// Device health summary check
pub struct HealthCheck;

#[async_trait]
impl Check for HealthCheck {
    fn name(&self) -> &'static str {
        "health"
    }

    fn title(&self) -> &'static str {
        "Health Check"
    }

    fn description(&self) -> &'static str {
        "Overall state is OK and uptime/firmware version are reported"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        _opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();

        let outcome = ctx
            .device
            .health()
            .await
            .map_err(CheckError::from)
            .and_then(|health| validate(&health).map(|()| health));

        match outcome {
            Ok(health) => {
                info!(
                    uptime_ms = health.uptime_ms,
                    firmware = %health.firmware_version,
                    "Health check passed"
                );
                Ok(CheckResult::passed(self.name(), start.elapsed())
                    .with_detail("uptime_ms", health.uptime_ms)
                    .with_detail("firmware_version", &health.firmware_version)
                    .with_message(format!(
                        "firmware {}, up {:.0}s",
                        health.firmware_version,
                        health.uptime_ms / 1000.0
                    )))
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                Ok(CheckResult::failed(self.name(), &e, start.elapsed()))
            }
        }
    }
}

fn validate(health: &HealthResponse) -> Result<(), CheckError> {
    if health.is_ok() {
        Ok(())
    } else {
        Err(CheckError::Semantic(format!(
            "health status is {:?}, expected {:?}",
            health.status,
            HealthResponse::OK
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::FailureKind;

    fn health(status: &str) -> HealthResponse {
        HealthResponse {
            status: status.to_string(),
            uptime_ms: 93_000.0,
            firmware_version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn test_check_metadata() {
        let check = HealthCheck;
        assert_eq!(check.name(), "health");
        assert!(!check.description().is_empty());
    }

    #[test]
    fn test_ok_sentinel_passes() {
        assert!(validate(&health("OK")).is_ok());
    }

    #[test]
    fn test_other_status_is_semantic_failure() {
        let err = validate(&health("DEGRADED")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Semantic);
        assert!(err.to_string().contains("DEGRADED"));
    }

    #[test]
    fn test_sentinel_is_case_sensitive() {
        assert!(validate(&health("ok")).is_err());
    }
}
