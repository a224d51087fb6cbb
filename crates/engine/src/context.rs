//! Diagnostic context – holds the probe gateway, transport check and limits.

use crate::platform::{AdbBridge, CannedGateway, CannedTransport, ProcessGateway};
use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default per-probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of tests executed concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Central context passed to the runner.
///
/// Holds trait-object capabilities so callers (CLI / tests) can swap the
/// real process gateway for recorded outputs.
pub struct DiagContext {
    gateway: Arc<dyn ProbeGateway>,
    transport: Arc<dyn TransportCheck>,
    /// Timeout applied to every single probe invocation.
    pub probe_timeout: Duration,
    /// Upper bound on concurrently executing tests.
    pub max_workers: usize,
}

impl DiagContext {
    pub fn new(gateway: Arc<dyn ProbeGateway>, transport: Arc<dyn TransportCheck>) -> Self {
        Self {
            gateway,
            transport,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// Create a context backed by real processes. The transport check is
    /// only consulted for bridged platforms, so it is always `adb`.
    pub fn default_platform() -> Self {
        let gateway: Arc<dyn ProbeGateway> = Arc::new(ProcessGateway);
        let transport = Arc::new(AdbBridge::new(gateway.clone(), Duration::from_secs(10)));
        Self::new(gateway, transport)
    }

    /// Create a context that answers from recorded outputs.
    pub fn canned(gateway: CannedGateway, reachable: bool) -> Self {
        Self::new(Arc::new(gateway), Arc::new(CannedTransport { reachable }))
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn gateway(&self) -> &dyn ProbeGateway {
        self.gateway.as_ref()
    }

    pub fn transport(&self) -> &dyn TransportCheck {
        self.transport.as_ref()
    }
}
