//! Check runner
//!
//! Runs checks one after another against a single device and collects a
//! [`TestRunReport`]. A failing, erroring or timed-out check is recorded and
//! the next check still runs.
//!
//! Read-only checks are dropped when their timeout fires or the shutdown
//! channel flips. Checks that write to the device (see
//! [`Check::cancel_safe`]) are always awaited to completion and stop
//! themselves, so an interrupted run never skips a restore. Once shutdown is
//! signalled, no further checks start.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::checks::{Check, CheckContext, CheckError, CheckOptions, CheckResult};
use crate::config::Config;
use crate::report::TestRunReport;
use crate::shutdown::{expired, interrupted};

pub struct Runner {
    ctx: CheckContext,
    config: Config,
}

impl Runner {
    pub fn new(ctx: CheckContext, config: Config) -> Self {
        Self { ctx, config }
    }

    /// Checks enabled in the configuration, in registry order
    pub fn enabled_checks(&self) -> Vec<Arc<dyn Check>> {
        crate::checks::CHECKS
            .iter()
            .filter(|(name, _)| self.config.is_check_enabled(name))
            .map(|(_, check)| check.clone())
            .collect()
    }

    /// Run `checks` in order and build the report
    pub async fn run(&self, checks: &[Arc<dyn Check>]) -> TestRunReport {
        let mut report = TestRunReport::new(self.ctx.device.label());

        info!(
            device = %self.ctx.device.label(),
            count = checks.len(),
            checks = ?checks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Running checks"
        );

        for check in checks {
            if self.ctx.is_shutting_down() {
                warn!(next = check.name(), "Run interrupted, skipping remaining checks");
                report.mark_interrupted();
                break;
            }

            let opts = self
                .config
                .check_options(check.name(), check.default_options());
            let result = self.run_one(check.as_ref(), &opts).await;

            if result.passed {
                info!(
                    check = %result.check_name,
                    duration_ms = result.duration.as_millis(),
                    message = ?result.message,
                    "Check PASSED"
                );
            } else {
                error!(
                    check = %result.check_name,
                    duration_ms = result.duration.as_millis(),
                    failure = ?result.failure,
                    diagnostics = ?result.diagnostics,
                    "Check FAILED"
                );
            }
            if let Some(hazard) = &result.hazard {
                warn!(check = %result.check_name, hazard = %hazard, "Device state diverged");
            }

            report.record(check.title(), result);
        }

        if self.ctx.is_shutting_down() {
            report.mark_interrupted();
        }

        info!(
            passed = report.passed_count(),
            total = report.total(),
            interrupted = report.interrupted,
            "All checks finished"
        );
        report
    }

    async fn run_one(&self, check: &dyn Check, opts: &CheckOptions) -> CheckResult {
        let start = Instant::now();
        debug!(check = check.name(), timeout = ?opts.timeout, "Starting check");

        let outcome = if check.cancel_safe() {
            let mut shutdown = self.ctx.shutdown.clone();
            tokio::select! {
                outcome = check.run(&self.ctx, opts) => outcome,
                limit = expired(opts.timeout) => Err(CheckError::Timeout(limit)),
                _ = interrupted(&mut shutdown) => Err(CheckError::Interrupted),
            }
        } else {
            check.run(&self.ctx, opts).await
        };

        outcome.unwrap_or_else(|e| CheckResult::failed(check.name(), &e, start.elapsed()))
    }
}
