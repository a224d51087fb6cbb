use std::time::Duration;

/// Exit code reported when a probe could not run to completion.
pub const PROBE_UNAVAILABLE_EXIT: i32 = -1;

/// Captured result of one external program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProbeOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Error-shaped result: empty stdout, descriptive stderr, exit code -1.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: reason.into(),
            exit_code: PROBE_UNAVAILABLE_EXIT,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Short reason for a failed probe, suitable for an explanation.
    pub fn failure_reason(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else {
            format!("exit code {}", self.exit_code)
        }
    }
}

// ---------------------------------------------------------------------------
// Probe gateway
// ---------------------------------------------------------------------------

/// Runs a named external program and captures its output.
///
/// Implementations never fail: nonzero exit, timeout and missing
/// executables are all reported through the returned [`ProbeOutput`].
#[async_trait::async_trait]
pub trait ProbeGateway: Send + Sync {
    async fn invoke(&self, program: &str, args: &[&str], timeout: Duration) -> ProbeOutput;
}

// ---------------------------------------------------------------------------
// Transport reachability
// ---------------------------------------------------------------------------

/// Pre-flight check for platforms reached over a bridge (e.g. adb).
#[async_trait::async_trait]
pub trait TransportCheck: Send + Sync {
    async fn is_reachable(&self) -> bool;
}
