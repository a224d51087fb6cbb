//! Result aggregation – a device-level summary over finished outcomes.

use crate::extract::round1;
use crate::types::{DiagnosticSummary, OverallStatus, Status, TestOutcome};

impl DiagnosticSummary {
    /// Reduce a finished outcome list. An empty list is healthy with a
    /// score of 0.
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let count = |s: Status| outcomes.iter().filter(|o| o.status == s).count();
        let total_tests = outcomes.len();
        let passed = count(Status::Pass);
        let warnings = count(Status::Warn);
        let failed = count(Status::Fail);
        let errors = count(Status::Error);

        let health_score = if total_tests == 0 {
            0.0
        } else {
            round1(passed as f64 / total_tests as f64 * 100.0)
        };

        let overall_status = if failed == 0 && errors == 0 {
            OverallStatus::Healthy
        } else {
            OverallStatus::IssuesDetected
        };

        Self {
            total_tests,
            passed,
            warnings,
            failed,
            errors,
            health_score,
            overall_status,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall_status == OverallStatus::Healthy
    }
}
