//! Probe plans – which external commands a test needs, and running them.

use crate::context::DiagContext;
use crate::error::{DiagError, DiagResult};
use crate::platform::command_line;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// One concrete command line.
#[derive(Debug, Clone, Copy)]
pub struct Invocation {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl Invocation {
    pub const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    pub fn command_line(&self) -> String {
        command_line(self.program, self.args)
    }
}

/// A named probe. Candidates are alternative command lines tried in order;
/// the first one that exits with code 0 supplies the output.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSpec {
    pub key: &'static str,
    pub candidates: &'static [Invocation],
    /// Optional probes may be absent from the transcript.
    pub required: bool,
}

/// Successful probe outputs of one test, keyed by [`ProbeSpec::key`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    outputs: HashMap<String, String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, stdout: &str) -> Self {
        self.insert(key, stdout);
        self
    }

    pub fn insert(&mut self, key: &str, stdout: &str) {
        self.outputs.insert(key.to_string(), stdout.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(|s| s.as_str())
    }

    /// Output of a required probe. Missing output is a contract violation
    /// between a catalog entry and its extractor.
    pub fn require(&self, key: &str) -> DiagResult<&str> {
        self.get(key)
            .ok_or_else(|| DiagError::Internal(format!("probe output '{}' missing", key)))
    }
}

/// Run every probe of a plan in order and collect the successful outputs.
///
/// A required probe whose candidates all fail aborts with
/// [`DiagError::ProbeUnavailable`]; an optional one is simply left out.
pub async fn collect(
    specs: &[ProbeSpec],
    ctx: &DiagContext,
    cancel: &CancellationToken,
) -> DiagResult<Transcript> {
    let mut transcript = Transcript::new();

    for spec in specs {
        let mut last_failure: Option<(String, String)> = None;

        for inv in spec.candidates {
            if cancel.is_cancelled() {
                return Err(DiagError::Cancelled);
            }
            let out = ctx
                .gateway()
                .invoke(inv.program, inv.args, ctx.probe_timeout)
                .await;
            if out.succeeded() {
                transcript.insert(spec.key, &out.stdout);
                last_failure = None;
                break;
            }
            tracing::debug!(
                probe = spec.key,
                command = %inv.command_line(),
                exit_code = out.exit_code,
                "probe candidate failed"
            );
            last_failure = Some((inv.program.to_string(), out.failure_reason()));
        }

        if let Some((program, reason)) = last_failure {
            if spec.required {
                return Err(DiagError::ProbeUnavailable { program, reason });
            }
            tracing::debug!(probe = spec.key, "optional probe unavailable");
        }
    }

    Ok(transcript)
}
