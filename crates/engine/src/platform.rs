//! Concrete implementations of the probe and transport traits.
//!
//! - [`ProcessGateway`]: real child processes via tokio
//! - [`AdbBridge`]: Android reachability via `adb devices`
//! - [`NoTransport`]: always reachable (desktop platforms)
//! - [`CannedGateway`] / [`CannedTransport`]: recorded outputs, no processes

use crate::traits::*;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ===========================================================================
// Process gateway – wraps tokio::process
// ===========================================================================

pub struct ProcessGateway;

#[async_trait::async_trait]
impl ProbeGateway for ProcessGateway {
    async fn invoke(&self, program: &str, args: &[&str], timeout: Duration) -> ProbeOutput {
        tracing::debug!(program, ?args, "invoking probe");

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => {
                tracing::warn!(program, timeout_s = timeout.as_secs(), "probe timed out");
                ProbeOutput::unavailable(format!(
                    "{} timed out after {}s",
                    program,
                    timeout.as_secs()
                ))
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                ProbeOutput::unavailable(missing_program_message(program))
            }
            Ok(Err(e)) => ProbeOutput::unavailable(format!("{}: {}", program, e)),
            Ok(Ok(out)) => ProbeOutput {
                stdout: String::from_utf8_lossy(&out.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
                exit_code: out.status.code().unwrap_or(PROBE_UNAVAILABLE_EXIT),
            },
        }
    }
}

fn missing_program_message(program: &str) -> String {
    match program {
        "adb" => "adb not found. Please install Android SDK platform-tools".to_string(),
        "powershell" => "powershell not found. Windows PowerShell is required".to_string(),
        other => format!("{} not found", other),
    }
}

// ===========================================================================
// Android bridge – `adb devices`
// ===========================================================================

/// Reachability check for a tethered Android device.
pub struct AdbBridge {
    gateway: Arc<dyn ProbeGateway>,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(gateway: Arc<dyn ProbeGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }
}

#[async_trait::async_trait]
impl TransportCheck for AdbBridge {
    async fn is_reachable(&self) -> bool {
        let out = self.gateway.invoke("adb", &["devices"], self.timeout).await;
        if !out.succeeded() {
            tracing::info!(reason = %out.failure_reason(), "adb unavailable");
            return false;
        }
        let serials = parse_adb_devices(&out.stdout);
        for serial in &serials {
            tracing::debug!(serial = %serial, "adb device ready");
        }
        !serials.is_empty()
    }
}

/// Serials of devices in the `device` state. Unauthorized and offline
/// devices are not usable and are left out.
pub fn parse_adb_devices(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let serial = parts.next()?.trim();
            let state = parts.next()?.trim();
            (state == "device" && !serial.is_empty()).then(|| serial.to_string())
        })
        .collect()
}

// ===========================================================================
// Desktop transport – nothing to check
// ===========================================================================

pub struct NoTransport;

#[async_trait::async_trait]
impl TransportCheck for NoTransport {
    async fn is_reachable(&self) -> bool {
        true
    }
}

// ===========================================================================
// Canned gateway – replays recorded outputs
// ===========================================================================

/// Gateway answering from a table of recorded outputs keyed by command line.
///
/// Unrecorded commands answer like a missing executable. Every invocation
/// is logged so callers can assert which probes ran.
#[derive(Default)]
pub struct CannedGateway {
    outputs: HashMap<String, ProbeOutput>,
    calls: Mutex<Vec<String>>,
}

impl CannedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command_line: &str, output: ProbeOutput) -> Self {
        self.insert(command_line, output);
        self
    }

    pub fn insert(&mut self, command_line: &str, output: ProbeOutput) {
        self.outputs.insert(normalize(command_line), output);
    }

    /// Command lines invoked so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProbeGateway for CannedGateway {
    async fn invoke(&self, program: &str, args: &[&str], _timeout: Duration) -> ProbeOutput {
        let line = command_line(program, args);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        self.outputs
            .get(&normalize(&line))
            .cloned()
            .unwrap_or_else(|| ProbeOutput::unavailable(missing_program_message(program)))
    }
}

/// Transport with a fixed answer.
pub struct CannedTransport {
    pub reachable: bool,
}

#[async_trait::async_trait]
impl TransportCheck for CannedTransport {
    async fn is_reachable(&self) -> bool {
        self.reachable
    }
}

/// Render a program and its arguments as one space-separated line.
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program);
    parts.extend_from_slice(args);
    parts.join(" ")
}

fn normalize(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
