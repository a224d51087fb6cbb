//! Fixture replay – reproduce a run offline from recorded tool output.

use crate::catalog::Platform;
use crate::context::DiagContext;
use crate::platform::CannedGateway;
use crate::traits::ProbeOutput;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to parse fixture YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("fixture probe #{index} has an empty command")]
    EmptyCommand { index: usize },
}

/// One recorded probe invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedProbe {
    pub command: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// Platform the outputs were recorded on; the caller's choice wins
    /// when absent.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// Answer given to the transport reachability check.
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    #[serde(default)]
    pub probes: Vec<RecordedProbe>,
}

fn default_reachable() -> bool {
    true
}

/// Load a fixture from a YAML string.
pub fn load_fixture(yaml: &str) -> Result<Fixture, ReplayError> {
    let fixture: Fixture = serde_yaml::from_str(yaml)?;
    if let Some(index) = fixture.probes.iter().position(|p| p.command.trim().is_empty()) {
        return Err(ReplayError::EmptyCommand { index });
    }
    Ok(fixture)
}

impl Fixture {
    pub fn gateway(&self) -> CannedGateway {
        let mut gw = CannedGateway::new();
        for p in &self.probes {
            gw.insert(
                &p.command,
                ProbeOutput {
                    stdout: p.stdout.clone(),
                    stderr: p.stderr.clone(),
                    exit_code: p.exit_code,
                },
            );
        }
        gw
    }

    /// Build a context that answers every probe from this fixture.
    pub fn into_context(self) -> DiagContext {
        tracing::debug!(
            probes = self.probes.len(),
            reachable = self.reachable,
            "loaded replay fixture"
        );
        DiagContext::canned(self.gateway(), self.reachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Runner;
    use crate::types::{RunRequest, Status};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    const MAC_FIXTURE: &str = r#"
platform: macos
probes:
  - command: "df -k /"
    stdout: |
      Filesystem 1024-blocks Used Available Capacity Mounted on
      /dev/disk3s1s1 1000000 820000 180000 82% /
  - command: "sysctl -n hw.memsize"
    stdout: "17179869184"
    exit_code: 0
"#;

    #[test]
    fn test_parse_fixture() {
        let f = load_fixture(MAC_FIXTURE).expect("should parse");
        assert_eq!(f.platform, Some(Platform::MacOs));
        assert!(f.reachable);
        assert_eq!(f.probes.len(), 2);
        assert_eq!(f.probes[1].stderr, "");
    }

    #[test]
    fn test_parse_fixture_minimal() {
        let f = load_fixture("reachable: false\n").expect("should parse");
        assert!(f.platform.is_none());
        assert!(!f.reachable);
        assert!(f.probes.is_empty());
    }

    #[test]
    fn test_rejects_bad_yaml_and_empty_command() {
        assert!(matches!(
            load_fixture("probes: [1, 2"),
            Err(ReplayError::Parse(_))
        ));
        assert!(matches!(
            load_fixture("probes:\n  - command: \"  \"\n"),
            Err(ReplayError::EmptyCommand { index: 0 })
        ));
    }

    #[tokio::test]
    async fn test_replayed_run_matches_recording() {
        let ctx = Arc::new(load_fixture(MAC_FIXTURE).unwrap().into_context());
        let req = RunRequest {
            platform: Platform::MacOs,
            test_ids: vec!["storage.health".into()],
        };
        let resp = Runner::new(ctx).run(&req, CancellationToken::new()).await;
        assert_eq!(resp.outcomes[0].status, Status::Warn);
    }
}
