use crate::catalog::Platform;
use crate::error::{DiagError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Outcome JSON – the stable output contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub test_id: String,
    pub category: Category,
    pub status: Status,
    #[serde(default)]
    pub metrics: Metrics,
    pub explanation: String,
    pub confidence: f64,
    #[serde(default)]
    pub advisories: Vec<String>,
    /// Which failure class produced an `error` outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
}

/// Per-test verdict. Ordered by severity: `Pass < Warn < Fail < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    Error,
}

impl Status {
    /// The worse of `self` and `other`.
    pub fn escalate(self, other: Status) -> Status {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
            Status::Error => "error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Power,
    Storage,
    Sensors,
    Network,
    Performance,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Power => "power",
            Category::Storage => "storage",
            Category::Sensors => "sensors",
            Category::Network => "network",
            Category::Performance => "performance",
            Category::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metric value. Serialised untagged so reports read naturally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Bool(v) => write!(f, "{}", v),
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
            MetricValue::Text(v) => f.write_str(v),
            MetricValue::List(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<Vec<String>> for MetricValue {
    fn from(v: Vec<String>) -> Self {
        MetricValue::List(v)
    }
}

/// Metric name → value. Ordered so that JSON output is deterministic.
pub type Metrics = BTreeMap<String, MetricValue>;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub errors: usize,
    pub health_score: f64,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    IssuesDetected,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::IssuesDetected => "issues_detected",
        }
    }
}

// ---------------------------------------------------------------------------
// Run request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub platform: Platform,
    pub test_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub run_id: String,
    pub platform: Platform,
    pub outcomes: Vec<TestOutcome>,
    pub summary: DiagnosticSummary,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a new run ID (UUIDv4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build an `error` outcome from a classified failure.
///
/// Error outcomes carry no metrics and a confidence of exactly zero.
pub fn outcome_err(
    test_id: &str,
    category: Category,
    err: &DiagError,
    advisories: Vec<String>,
) -> TestOutcome {
    TestOutcome {
        test_id: test_id.to_string(),
        category,
        status: Status::Error,
        metrics: Metrics::new(),
        explanation: err.explanation(test_id),
        confidence: 0.0,
        advisories,
        error_kind: Some(err.kind()),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_escalation_is_monotonic() {
        assert_eq!(Status::Pass.escalate(Status::Warn), Status::Warn);
        assert_eq!(Status::Fail.escalate(Status::Warn), Status::Fail);
        assert_eq!(Status::Warn.escalate(Status::Pass), Status::Warn);
    }

    #[test]
    fn test_status_serialises_snake_case() {
        let v = serde_json::to_value(Status::Warn).unwrap();
        assert_eq!(v, "warn");
        let v = serde_json::to_value(OverallStatus::IssuesDetected).unwrap();
        assert_eq!(v, "issues_detected");
    }

    #[test]
    fn test_error_outcome_shape() {
        let err = DiagError::UnknownTest("foo.bar".into());
        let o = outcome_err("foo.bar", Category::Unknown, &err, vec![]);
        assert_eq!(o.status, Status::Error);
        assert_eq!(o.confidence, 0.0);
        assert!(o.metrics.is_empty());
        assert!(o.explanation.contains("foo.bar"));
        assert_eq!(o.error_kind, Some(ErrorKind::UnknownTest));
    }

    #[test]
    fn test_metric_values_serialise_untagged() {
        let mut m = Metrics::new();
        m.insert("level".into(), 80i64.into());
        m.insert("health".into(), "good".into());
        m.insert("found".into(), vec!["light".to_string()].into());
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["level"], 80);
        assert_eq!(v["health"], "good");
        assert_eq!(v["found"][0], "light");
    }
}
