//! Diagnostic runner – executes a batch of test ids against one platform.
//!
//! A run moves through `Init → ConnectivityCheck → Executing → Completed`,
//! or ends in `Unreachable` when a bridged device cannot be reached. Every
//! requested id yields exactly one outcome, in request order.

use crate::catalog::{self, Assessment, TestEntry};
use crate::context::DiagContext;
use crate::error::{DiagError, DiagResult};
use crate::probes;
use crate::types::*;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Remediation attached to every outcome of an unreachable Android run.
pub const TRANSPORT_ADVISORIES: &[&str] = &[
    "Install ADB (Android SDK platform-tools)",
    "Enable Developer Options on your Android device",
    "Enable USB Debugging in Developer Options",
    "Connect device with USB cable and accept debugging prompt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    ConnectivityCheck,
    Unreachable,
    Executing,
    Completed,
}

enum Slot {
    Settled(TestOutcome),
    Running(&'static TestEntry, JoinHandle<DiagResult<Assessment>>),
}

pub struct Runner {
    ctx: Arc<DiagContext>,
}

impl Runner {
    pub fn new(ctx: Arc<DiagContext>) -> Self {
        Self { ctx }
    }

    /// Run every requested test and summarise the outcomes.
    ///
    /// Never fails: unreachable transports, missing tools, unparseable
    /// output, unknown ids and cancellation all become `error` outcomes.
    pub async fn run(&self, request: &RunRequest, cancel: CancellationToken) -> RunResponse {
        let run_id = new_run_id();
        let platform = request.platform;
        log_phase(&run_id, RunPhase::Init);

        let outcomes = if platform.transport_gated() {
            log_phase(&run_id, RunPhase::ConnectivityCheck);
            if self.ctx.transport().is_reachable().await {
                log_phase(&run_id, RunPhase::Executing);
                self.execute(request, &cancel).await
            } else {
                log_phase(&run_id, RunPhase::Unreachable);
                tracing::warn!(%platform, "device unreachable; no tests executed");
                unreachable_outcomes(request)
            }
        } else {
            log_phase(&run_id, RunPhase::Executing);
            self.execute(request, &cancel).await
        };

        let summary = DiagnosticSummary::from_outcomes(&outcomes);
        log_phase(&run_id, RunPhase::Completed);
        tracing::info!(
            run_id = %run_id,
            %platform,
            total = summary.total_tests,
            passed = summary.passed,
            health_score = summary.health_score,
            "diagnostic run completed"
        );

        RunResponse {
            run_id,
            platform,
            outcomes,
            summary,
        }
    }

    async fn execute(&self, request: &RunRequest, cancel: &CancellationToken) -> Vec<TestOutcome> {
        let permits = Arc::new(Semaphore::new(self.ctx.max_workers.max(1)));
        let mut slots = Vec::with_capacity(request.test_ids.len());

        for test_id in &request.test_ids {
            let Some(entry) = catalog::lookup(request.platform, test_id) else {
                tracing::warn!(test_id = %test_id, platform = %request.platform, "unknown test");
                let err = DiagError::UnknownTest(test_id.clone());
                slots.push(Slot::Settled(outcome_err(
                    test_id,
                    Category::Unknown,
                    &err,
                    vec![],
                )));
                continue;
            };

            let ctx = self.ctx.clone();
            let permits = permits.clone();
            let cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DiagError::Cancelled),
                    permit = permits.acquire_owned() => {
                        permit.map_err(|_| DiagError::Cancelled)?
                    }
                };
                tracing::info!(test_id = entry.id, "running test");
                run_test(entry, &ctx, &cancel).await
            });
            slots.push(Slot::Running(entry, handle));
        }

        let mut outcomes = Vec::with_capacity(slots.len());
        for slot in slots {
            let outcome = match slot {
                Slot::Settled(o) => o,
                Slot::Running(entry, handle) => settle(entry, handle.await),
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn run_test(
    entry: &'static TestEntry,
    ctx: &DiagContext,
    cancel: &CancellationToken,
) -> DiagResult<Assessment> {
    let transcript = probes::collect(entry.probes, ctx, cancel).await?;
    (entry.evaluate)(&transcript)
}

/// Turn a finished (or crashed) test task into its outcome.
fn settle(
    entry: &TestEntry,
    joined: Result<DiagResult<Assessment>, JoinError>,
) -> TestOutcome {
    let result = joined.unwrap_or_else(|e| {
        let reason = if e.is_panic() {
            "test panicked".to_string()
        } else {
            e.to_string()
        };
        Err(DiagError::Internal(reason))
    });

    match result {
        Ok(assessment) => {
            tracing::info!(
                test_id = entry.id,
                status = %assessment.verdict.status,
                "test finished"
            );
            outcome_from_assessment(entry, assessment)
        }
        Err(err) => {
            tracing::warn!(test_id = entry.id, error = %err, "test errored");
            outcome_err(entry.id, entry.category, &err, vec![])
        }
    }
}

fn outcome_from_assessment(entry: &TestEntry, assessment: Assessment) -> TestOutcome {
    let verdict = assessment.verdict;
    TestOutcome {
        test_id: entry.id.to_string(),
        category: entry.category,
        status: verdict.status,
        metrics: assessment.metrics,
        explanation: verdict.explanation,
        confidence: verdict.confidence,
        advisories: verdict.advisories,
        error_kind: None,
        created_at: Utc::now(),
    }
}

fn unreachable_outcomes(request: &RunRequest) -> Vec<TestOutcome> {
    let err = DiagError::TransportUnreachable(
        "No Android device connected. Enable USB debugging and connect device.".into(),
    );
    let advisories: Vec<String> = TRANSPORT_ADVISORIES.iter().map(|s| s.to_string()).collect();
    request
        .test_ids
        .iter()
        .map(|id| {
            let category = catalog::lookup(request.platform, id)
                .map(|e| e.category)
                .unwrap_or(Category::Unknown);
            outcome_err(id, category, &err, advisories.clone())
        })
        .collect()
}

fn log_phase(run_id: &str, phase: RunPhase) {
    tracing::debug!(run_id, ?phase, "run phase");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Platform;
    use crate::error::ErrorKind;
    use crate::platform::{command_line, CannedGateway, CannedTransport};
    use crate::probes::Transcript;
    use crate::traits::{ProbeGateway, ProbeOutput};
    use std::collections::HashMap;
    use std::time::Duration;

    fn command_for(platform: Platform, test_id: &str, step: usize) -> String {
        catalog::lookup(platform, test_id).unwrap().probes[step].candidates[0].command_line()
    }

    fn request(platform: Platform, ids: &[&str]) -> RunRequest {
        RunRequest {
            platform,
            test_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn windows_disk(size: u64, free: u64) -> ProbeOutput {
        ProbeOutput::ok(format!("Size      : {}\nFreeSpace : {}", size, free))
    }

    async fn run_with(gw: CannedGateway, reachable: bool, req: &RunRequest) -> RunResponse {
        let ctx = Arc::new(DiagContext::canned(gw, reachable));
        Runner::new(ctx).run(req, CancellationToken::new()).await
    }

    /// Canned answers plus scripted misbehaviour: per-command delays, a
    /// command that panics, and a token cancelled as soon as anything runs.
    #[derive(Default)]
    struct ScriptedGateway {
        inner: CannedGateway,
        delays: HashMap<String, Duration>,
        panic_on: Option<String>,
        cancels: Option<CancellationToken>,
    }

    #[async_trait::async_trait]
    impl ProbeGateway for ScriptedGateway {
        async fn invoke(&self, program: &str, args: &[&str], timeout: Duration) -> ProbeOutput {
            let line = command_line(program, args);
            if let Some(token) = &self.cancels {
                token.cancel();
            }
            if self.panic_on.as_deref() == Some(line.as_str()) {
                panic!("gateway fault on {line}");
            }
            if let Some(delay) = self.delays.get(&line) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.invoke(program, args, timeout).await
        }
    }

    fn windows_answers() -> CannedGateway {
        CannedGateway::new()
            .with(
                &command_for(Platform::Windows, "storage.health", 0),
                windows_disk(1_000_000_000, 500_000_000),
            )
            .with(
                &command_for(Platform::Windows, "cpu.temperature", 0),
                ProbeOutput::ok(
                    "LoadPercentage            : 12\nNumberOfLogicalProcessors : 8\nCurrentClockSpeed         : 2400",
                ),
            )
            .with(
                &command_for(Platform::Windows, "memory.test", 0),
                ProbeOutput::ok("TotalVisibleMemorySize : 16000000\nFreePhysicalMemory     : 8000000"),
            )
    }

    fn scripted_context(gw: ScriptedGateway, workers: usize) -> Arc<DiagContext> {
        Arc::new(
            DiagContext::new(Arc::new(gw), Arc::new(CannedTransport { reachable: true }))
                .with_max_workers(workers),
        )
    }

    #[tokio::test]
    async fn test_unknown_id_does_not_abort_batch() {
        let gw = CannedGateway::new().with(
            &command_for(Platform::Windows, "storage.health", 0),
            windows_disk(1_000_000_000, 500_000_000),
        );
        let req = request(Platform::Windows, &["foo.bar", "storage.health"]);
        let resp = run_with(gw, true, &req).await;

        assert_eq!(resp.outcomes.len(), 2);
        let unknown = &resp.outcomes[0];
        assert_eq!(unknown.test_id, "foo.bar");
        assert_eq!(unknown.status, Status::Error);
        assert_eq!(unknown.category, Category::Unknown);
        assert!(unknown.explanation.contains("not implemented"));
        assert_eq!(unknown.error_kind, Some(ErrorKind::UnknownTest));

        assert_eq!(resp.outcomes[1].test_id, "storage.health");
        assert_eq!(resp.outcomes[1].status, Status::Pass);
    }

    #[tokio::test]
    async fn test_unreachable_transport_short_circuits() {
        let gw = Arc::new(CannedGateway::new());
        let ctx = Arc::new(DiagContext::new(
            gw.clone(),
            Arc::new(crate::platform::CannedTransport { reachable: false }),
        ));
        let req = request(Platform::Android, &["battery.health", "storage.health"]);
        let resp = Runner::new(ctx).run(&req, CancellationToken::new()).await;

        assert_eq!(resp.outcomes.len(), 2);
        for o in &resp.outcomes {
            assert_eq!(o.status, Status::Error);
            assert_eq!(o.confidence, 0.0);
            assert_eq!(o.error_kind, Some(ErrorKind::TransportUnreachable));
            assert_eq!(o.advisories.len(), TRANSPORT_ADVISORIES.len());
        }
        assert_eq!(resp.outcomes[0].advisories, resp.outcomes[1].advisories);
        assert!(gw.calls().is_empty());
        assert_eq!(resp.summary.errors, 2);
    }

    #[tokio::test]
    async fn test_reachable_android_runs_probes() {
        let gw = CannedGateway::new().with(
            &command_for(Platform::Android, "battery.health", 0),
            ProbeOutput::ok("level: 90\nhealth: 2\nstatus: 3\ntemperature: 450"),
        );
        let req = request(Platform::Android, &["battery.health"]);
        let resp = run_with(gw, true, &req).await;

        let o = &resp.outcomes[0];
        assert_eq!(o.status, Status::Warn);
        assert_eq!(o.category, Category::Power);
        assert!(o.advisories.iter().any(|a| a.contains("temperature is high")));
        assert_eq!(o.confidence, crate::classify::BATTERY_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_missing_tool_is_probe_unavailable() {
        let req = request(Platform::MacOs, &["memory.test"]);
        let resp = run_with(CannedGateway::new(), true, &req).await;
        let o = &resp.outcomes[0];
        assert_eq!(o.status, Status::Error);
        assert_eq!(o.error_kind, Some(ErrorKind::ProbeUnavailable));
        assert!(o.metrics.is_empty());
        assert!(!o.explanation.is_empty());
    }

    #[tokio::test]
    async fn test_zero_capacity_storage_is_error() {
        let gw = CannedGateway::new().with(
            &command_for(Platform::Windows, "storage.health", 0),
            windows_disk(0, 0),
        );
        let req = request(Platform::Windows, &["storage.health"]);
        let resp = run_with(gw, true, &req).await;
        let o = &resp.outcomes[0];
        assert_eq!(o.status, Status::Error);
        assert_eq!(o.error_kind, Some(ErrorKind::ParseFailure));
        assert_eq!(o.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_outcome_order_matches_request_with_one_worker() {
        let gw = CannedGateway::new()
            .with(
                &command_for(Platform::Windows, "storage.health", 0),
                windows_disk(1000 * 1024, 50 * 1024),
            )
            .with(
                &command_for(Platform::Windows, "cpu.temperature", 0),
                ProbeOutput::ok("LoadPercentage : 12"),
            );
        let ids = ["cpu.temperature", "memory.test", "storage.health", "nope"];
        let req = request(Platform::Windows, &ids);
        let ctx = Arc::new(DiagContext::canned(gw, true).with_max_workers(1));
        let resp = Runner::new(ctx).run(&req, CancellationToken::new()).await;

        let got: Vec<_> = resp.outcomes.iter().map(|o| o.test_id.as_str()).collect();
        assert_eq!(got, ids);
        assert_eq!(resp.outcomes[0].status, Status::Pass);
        assert_eq!(resp.outcomes[1].status, Status::Error);
        assert_eq!(resp.outcomes[2].status, Status::Fail);
        assert_eq!(resp.summary.total_tests, 4);
        assert_eq!(resp.summary.health_score, 25.0);
    }

    #[tokio::test]
    async fn test_cancelled_run_issues_no_probes() {
        let gw = Arc::new(CannedGateway::new());
        let ctx = Arc::new(DiagContext::new(
            gw.clone(),
            Arc::new(crate::platform::NoTransport),
        ));
        let token = CancellationToken::new();
        token.cancel();
        let req = request(Platform::Windows, &["battery.health", "memory.test"]);
        let resp = Runner::new(ctx).run(&req, token).await;

        assert_eq!(resp.outcomes.len(), 2);
        assert!(resp
            .outcomes
            .iter()
            .all(|o| o.error_kind == Some(ErrorKind::Cancelled)));
        assert!(gw.calls().is_empty());
    }

    fn panicking_evaluator(_: &Transcript) -> DiagResult<Assessment> {
        panic!("extractor contract violated")
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_internal_error() {
        let entry = catalog::lookup(Platform::Windows, "memory.test").unwrap();
        let handle = tokio::spawn(async { panicking_evaluator(&Transcript::new()) });
        let o = settle(entry, handle.await);
        assert_eq!(o.status, Status::Error);
        assert_eq!(o.error_kind, Some(ErrorKind::Internal));
        assert_eq!(o.category, Category::Performance);
    }

    #[tokio::test]
    async fn test_cancel_during_first_test_settles_the_rest_as_cancelled() {
        let token = CancellationToken::new();
        let gw = ScriptedGateway {
            inner: windows_answers(),
            cancels: Some(token.clone()),
            ..Default::default()
        };
        let req = request(
            Platform::Windows,
            &["storage.health", "cpu.temperature", "memory.test"],
        );
        let resp = Runner::new(scripted_context(gw, 1)).run(&req, token).await;

        assert_eq!(resp.outcomes.len(), 3);
        assert_eq!(resp.outcomes[0].test_id, "storage.health");
        assert_eq!(resp.outcomes[0].status, Status::Pass);
        assert_eq!(resp.outcomes[0].error_kind, None);
        for o in &resp.outcomes[1..] {
            assert_eq!(o.status, Status::Error);
            assert_eq!(o.error_kind, Some(ErrorKind::Cancelled));
        }
        assert_eq!(resp.outcomes[1].test_id, "cpu.temperature");
        assert_eq!(resp.outcomes[2].test_id, "memory.test");
    }

    #[tokio::test]
    async fn test_request_order_survives_out_of_order_completion() {
        let inner = windows_answers();
        let delays = HashMap::from([
            (
                command_for(Platform::Windows, "storage.health", 0),
                Duration::from_millis(80),
            ),
            (
                command_for(Platform::Windows, "cpu.temperature", 0),
                Duration::from_millis(40),
            ),
        ]);
        let gw = Arc::new(ScriptedGateway {
            inner,
            delays,
            ..Default::default()
        });
        let ctx = Arc::new(
            DiagContext::new(gw.clone(), Arc::new(CannedTransport { reachable: true }))
                .with_max_workers(3),
        );
        let req = request(
            Platform::Windows,
            &["storage.health", "cpu.temperature", "memory.test"],
        );
        let resp = Runner::new(ctx).run(&req, CancellationToken::new()).await;

        // Completion order is the reverse of the request.
        assert_eq!(
            gw.inner.calls(),
            vec![
                command_for(Platform::Windows, "memory.test", 0),
                command_for(Platform::Windows, "cpu.temperature", 0),
                command_for(Platform::Windows, "storage.health", 0),
            ]
        );
        let ids: Vec<&str> = resp.outcomes.iter().map(|o| o.test_id.as_str()).collect();
        assert_eq!(ids, ["storage.health", "cpu.temperature", "memory.test"]);
        assert!(resp.outcomes.iter().all(|o| o.status == Status::Pass));
    }

    #[tokio::test]
    async fn test_panic_in_one_test_leaves_sibling_intact() {
        let gw = ScriptedGateway {
            inner: windows_answers(),
            panic_on: Some(command_for(Platform::Windows, "cpu.temperature", 0)),
            ..Default::default()
        };
        let req = request(Platform::Windows, &["cpu.temperature", "storage.health"]);
        let resp = Runner::new(scripted_context(gw, 2))
            .run(&req, CancellationToken::new())
            .await;

        assert_eq!(resp.outcomes.len(), 2);
        let panicked = &resp.outcomes[0];
        assert_eq!(panicked.test_id, "cpu.temperature");
        assert_eq!(panicked.status, Status::Error);
        assert_eq!(panicked.error_kind, Some(ErrorKind::Internal));
        assert_eq!(resp.outcomes[1].test_id, "storage.health");
        assert_eq!(resp.outcomes[1].status, Status::Pass);
        assert_eq!(resp.summary.passed, 1);
    }

    #[tokio::test]
    async fn test_missing_free_space_is_parse_failure() {
        let gw = CannedGateway::new().with(
            &command_for(Platform::Windows, "storage.health", 0),
            ProbeOutput::ok("Size      : 512000000000"),
        );
        let req = request(Platform::Windows, &["storage.health"]);
        let resp = run_with(gw, true, &req).await;
        assert_eq!(resp.outcomes[0].status, Status::Error);
        assert_eq!(resp.outcomes[0].error_kind, Some(ErrorKind::ParseFailure));
    }

    #[tokio::test]
    async fn test_empty_request_is_healthy() {
        let req = request(Platform::MacOs, &[]);
        let resp = run_with(CannedGateway::new(), true, &req).await;
        assert!(resp.outcomes.is_empty());
        assert_eq!(resp.summary.health_score, 0.0);
        assert!(resp.summary.is_healthy());
    }
}
