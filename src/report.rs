//! Test run report
//!
//! Collects check results in execution order and renders the console
//! summary table.

use serde::Serialize;
use std::fmt::Write;

use crate::checks::CheckResult;

/// Outcome of one orchestrated run
#[derive(Debug, Clone, Serialize)]
pub struct TestRunReport {
    /// Device the checks ran against
    pub target: String,
    /// Results in execution order
    pub results: Vec<CheckResult>,
    /// The operator stopped the run; checks after the last result never ran
    pub interrupted: bool,
    /// Display title per result, same order as `results`
    #[serde(skip)]
    titles: Vec<String>,
}

impl TestRunReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            results: Vec::new(),
            interrupted: false,
            titles: Vec::new(),
        }
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Append a result under the title shown in the summary table
    pub fn record(&mut self, title: impl Into<String>, result: CheckResult) {
        self.titles.push(title.into());
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Fraction of checks that passed, 0.0 for an empty run
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passed_count() as f64 / self.total() as f64
        }
    }

    /// True when at least one check ran and none failed
    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }

    /// A complete passing run that left the device as it was found
    pub fn is_clean(&self) -> bool {
        self.all_passed() && !self.has_hazards() && !self.interrupted
    }

    /// Operational hazards raised by checks, as `(check_name, hazard)`
    pub fn hazards(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.hazard.as_deref().map(|h| (r.check_name.as_str(), h)))
            .collect()
    }

    pub fn has_hazards(&self) -> bool {
        self.results.iter().any(|r| r.hazard.is_some())
    }

    /// Result for a check by name
    pub fn get(&self, check_name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check_name == check_name)
    }

    /// Human-readable summary table
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "  Test Summary ({})", self.target);
        let _ = writeln!(out, "{rule}");

        for (title, result) in self.titles.iter().zip(&self.results) {
            let status = if result.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "{title:.<40} {status}");
            if !result.passed {
                for diagnostic in &result.diagnostics {
                    let _ = writeln!(out, "    {diagnostic}");
                }
            }
        }

        let hazards = self.hazards();
        if !hazards.is_empty() {
            out.push('\n');
            for (check, hazard) in hazards {
                let _ = writeln!(out, "WARNING [{check}]: {hazard}");
            }
        }

        if self.interrupted {
            let _ = writeln!(out, "\nRun interrupted by user, remaining checks skipped");
        }

        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(
            out,
            "Results: {}/{} tests passed ({:.0}%)",
            self.passed_count(),
            self.total(),
            self.pass_rate() * 100.0
        );
        let _ = writeln!(out, "{rule}");
        out
    }

    /// Process exit code for this run
    ///
    /// `2` when a check left the device diverged from its prior state, `130`
    /// when the operator interrupted the run, `1` when any check failed, `0`
    /// otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.has_hazards() {
            2
        } else if self.interrupted {
            130
        } else if self.all_passed() {
            0
        } else {
            1
        }
    }

    /// Machine-readable report
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckError;
    use std::time::Duration;

    fn sample_report() -> TestRunReport {
        let mut report = TestRunReport::new("north-field");
        report.record(
            "Health Check",
            CheckResult::passed("health", Duration::from_millis(20)),
        );
        report.record(
            "Status Check",
            CheckResult::failed(
                "status",
                &CheckError::Semantic("alert level BLUE".into()),
                Duration::from_millis(30),
            ),
        );
        report.record(
            "Config POST",
            CheckResult::passed("config-roundtrip", Duration::from_millis(1200))
                .with_hazard("device may still run TEST_PROFILE"),
        );
        report
    }

    #[test]
    fn test_counts() {
        let report = sample_report();
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed_count(), 2);
        assert!((report.pass_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(!report.all_passed());
        assert!(report.has_hazards());
        assert_eq!(
            report.hazards(),
            vec![("config-roundtrip", "device may still run TEST_PROFILE")]
        );
    }

    #[test]
    fn test_empty_report_is_not_a_pass() {
        let report = TestRunReport::new("x");
        assert_eq!(report.pass_rate(), 0.0);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_render_text() {
        let text = sample_report().render_text();
        assert!(text.contains("Health Check............................ PASS"));
        assert!(text.contains("Status Check............................ FAIL"));
        assert!(text.contains("    alert level BLUE"));
        assert!(text.contains("WARNING [config-roundtrip]: device may still run TEST_PROFILE"));
        assert!(text.contains("Results: 2/3 tests passed (67%)"));
    }

    #[test]
    fn test_json_report() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_report().to_json().unwrap()).unwrap();
        assert_eq!(json["target"], "north-field");
        assert_eq!(json["results"].as_array().unwrap().len(), 3);
        assert_eq!(json["results"][1]["failure"], "semantic");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(sample_report().exit_code(), 2);

        let mut failing = TestRunReport::new("x");
        failing.record(
            "Ping Test",
            CheckResult::failed(
                "ping",
                &CheckError::Semantic("pong is false".into()),
                Duration::ZERO,
            ),
        );
        assert_eq!(failing.exit_code(), 1);

        let mut passing = TestRunReport::new("x");
        passing.record("Ping Test", CheckResult::passed("ping", Duration::ZERO));
        assert_eq!(passing.exit_code(), 0);

        assert_eq!(TestRunReport::new("x").exit_code(), 1);
    }

    #[test]
    fn test_interrupted_run() {
        let mut report = TestRunReport::new("x");
        report.record("Ping Test", CheckResult::passed("ping", Duration::ZERO));
        report.mark_interrupted();
        assert!(report.all_passed());
        assert!(!report.is_clean());
        assert_eq!(report.exit_code(), 130);
        assert!(report.render_text().contains("Run interrupted by user"));

        // a hazard still outranks the interrupt
        let mut hazardous = sample_report();
        hazardous.mark_interrupted();
        assert_eq!(hazardous.exit_code(), 2);
    }

    #[test]
    fn test_hazard_is_not_clean() {
        let mut report = TestRunReport::new("x");
        report.record(
            "Config POST",
            CheckResult::passed("config-roundtrip", Duration::ZERO).with_hazard("not restored"),
        );
        assert!(report.all_passed());
        assert!(!report.is_clean());

        let mut clean = TestRunReport::new("x");
        clean.record("Ping Test", CheckResult::passed("ping", Duration::ZERO));
        assert!(clean.is_clean());
    }

    #[test]
    fn test_get() {
        let report = sample_report();
        assert!(report.get("health").unwrap().passed);
        assert!(report.get("datalog").is_none());
    }
}
