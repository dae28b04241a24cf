//! Ping Check
//!
//! Minimal liveness probe: `GET /ping` must answer `{"pong": true}`.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

use super::traits::{Check, CheckContext, CheckError, CheckOptions, CheckResult};

pub struct PingCheck;

#[async_trait]
impl Check for PingCheck {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn title(&self) -> &'static str {
        "Ping Test"
    }

    fn description(&self) -> &'static str {
        "Liveness endpoint acknowledges with pong=true"
    }

    async fn run(
        &self,
        ctx: &CheckContext,
        _opts: &CheckOptions,
    ) -> Result<CheckResult, CheckError> {
        let start = Instant::now();

        let outcome = match ctx.device.ping().await {
            Ok(ping) if ping.pong => Ok(()),
            Ok(_) => Err(CheckError::Semantic("pong is false".to_string())),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) => {
                let duration = start.elapsed();
                info!(rtt_ms = duration.as_millis(), "Ping check passed");
                Ok(CheckResult::passed(self.name(), duration)
                    .with_detail("rtt_ms", duration.as_millis() as u64))
            }
            Err(e) => {
                warn!(error = %e, "Ping check failed");
                Ok(CheckResult::failed(self.name(), &e, start.elapsed()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_metadata() {
        let check = PingCheck;
        assert_eq!(check.name(), "ping");
        assert_eq!(check.title(), "Ping Test");
    }
}
