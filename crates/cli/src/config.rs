use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiagConfig {
    pub probe_timeout_secs: u64,
    pub max_workers: usize,
    pub logging: LoggingConfig,
}

impl DiagConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub show_time: bool,
    pub show_target: bool,
    /// One JSON object per event instead of text lines.
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub redaction: RedactionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedactionConfig {
    #[serde(default = "true_default")]
    pub enabled: bool,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<RedactionPattern>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: default_patterns(),
        }
    }
}

fn true_default() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedactionPattern {
    pub name: String,
    pub regex: String,
    pub placeholder: String,
}

/// Device serials as logged by the adb bridge, in text and JSON output.
fn default_patterns() -> Vec<RedactionPattern> {
    vec![
        RedactionPattern {
            name: "adb_serial".to_string(),
            regex: r"serial=\S+".to_string(),
            placeholder: "serial=<redacted>".to_string(),
        },
        RedactionPattern {
            name: "adb_serial_json".to_string(),
            regex: r#""serial":"[^"]*""#.to_string(),
            placeholder: r#""serial":"<redacted>""#.to_string(),
        },
    ]
}

/// Load configuration: built-in defaults, then `diagctl.yaml`, then the
/// `.diagctl.yaml` local override, then `DIAGCTL__*` environment variables.
pub fn load_config() -> Result<DiagConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("probe_timeout_secs", 30)?
        .set_default("max_workers", 4)?
        .set_default("logging.level", "info")?
        .set_default("logging.show_time", false)?
        .set_default("logging.show_target", false)?
        .set_default("logging.json", false)?
        .add_source(File::with_name("diagctl.yaml").required(false))
        // Local override
        .add_source(File::with_name(".diagctl.yaml").required(false))
        // Map nested env vars like DIAGCTL__LOGGING__LEVEL=debug
        .add_source(Environment::with_prefix("DIAGCTL").separator("__"));

    builder.build()?.try_deserialize()
}
