//! Health classifiers – typed readings to verdicts.
//!
//! Every classifier is a pure function over one reading. Rules are applied
//! in order through an [`Escalation`], so a verdict only ever moves toward
//! worse severity and advisories accumulate across triggered rules.
//! Confidence is a fixed constant per capability: it reflects how far the
//! text scraping behind the reading can be trusted, not the data itself.

use crate::error::{DiagError, DiagResult};
use crate::extract::{
    BatteryHealth, BatteryReading, ChargeState, CpuReading, MemoryReading, NetworkReading,
    SensorReading, StorageReading,
};
use crate::types::Status;

pub const BATTERY_CONFIDENCE: f64 = 0.90;
pub const STORAGE_CONFIDENCE: f64 = 0.90;
pub const SENSORS_CONFIDENCE: f64 = 0.75;
pub const NETWORK_CONFIDENCE: f64 = 0.80;
pub const CPU_CONFIDENCE: f64 = 0.80;
pub const MEMORY_CONFIDENCE: f64 = 0.95;

pub const BATTERY_TEMP_WARN_C: f64 = 40.0;
pub const BATTERY_TEMP_FAIL_C: f64 = 50.0;
pub const BATTERY_CAPACITY_WARN_PCT: f64 = 80.0;
pub const BATTERY_CAPACITY_FAIL_PCT: f64 = 60.0;
pub const BATTERY_LOW_LEVEL_PCT: i64 = 15;

pub const STORAGE_WARN_PCT: f64 = 80.0;
pub const STORAGE_ADVISE_PCT: f64 = 85.0;
pub const STORAGE_FAIL_PCT: f64 = 90.0;

pub const SENSORS_PASS_COUNT: usize = 5;
pub const SENSORS_WARN_COUNT: usize = 3;

pub const CPU_WARN_PCT: f64 = 80.0;
pub const CPU_ADVISE_PCT: f64 = 90.0;
pub const CPU_FAIL_PCT: f64 = 95.0;

pub const MEMORY_WARN_PCT: f64 = 80.0;
pub const MEMORY_ADVISE_PCT: f64 = 85.0;
pub const MEMORY_FAIL_PCT: f64 = 90.0;

/// Result of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: Status,
    pub explanation: String,
    pub advisories: Vec<String>,
    pub confidence: f64,
}

/// Escalation-only accumulator for a verdict under construction.
#[derive(Debug, Clone)]
pub struct Escalation {
    status: Status,
    advisories: Vec<String>,
}

impl Default for Escalation {
    fn default() -> Self {
        Self::new()
    }
}

impl Escalation {
    pub fn new() -> Self {
        Self {
            status: Status::Pass,
            advisories: Vec::new(),
        }
    }

    /// Move to `status` unless the verdict is already worse.
    pub fn raise(&mut self, status: Status) -> &mut Self {
        self.status = self.status.escalate(status);
        self
    }

    pub fn advise(&mut self, advisory: impl Into<String>) -> &mut Self {
        self.advisories.push(advisory.into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn finish(self, explanation: String, confidence: f64) -> Verdict {
        Verdict {
            status: self.status,
            explanation,
            advisories: self.advisories,
            confidence,
        }
    }
}

/// Three-band verdict over a usage percentage.
fn usage_band(pct: f64, warn_at: f64, fail_at: f64) -> Status {
    if pct >= fail_at {
        Status::Fail
    } else if pct >= warn_at {
        Status::Warn
    } else {
        Status::Pass
    }
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

pub fn battery(r: &BatteryReading) -> DiagResult<Verdict> {
    let mut esc = Escalation::new();
    let level = r
        .level_percent
        .map(|l| format!("{}%", l))
        .unwrap_or_else(|| "unknown".into());
    let mut explanation = format!("Battery level: {}, Health: {}", level, r.health.as_str());

    if r.health != BatteryHealth::Good {
        esc.raise(Status::Warn)
            .advise("Consider battery replacement if issues persist");
        explanation.push_str(". Battery health is not optimal");
    }

    if let Some(temp) = r.temperature_c {
        if temp > BATTERY_TEMP_WARN_C {
            esc.raise(Status::Warn)
                .advise(format!("Battery temperature is high ({:.1}°C)", temp));
        }
        if temp > BATTERY_TEMP_FAIL_C {
            esc.raise(Status::Fail)
                .advise("Critical: Battery overheating detected");
        }
    }

    if let Some(cap) = r.capacity_health_percent() {
        explanation.push_str(&format!(". Capacity at {:.1}% of design", cap));
        if cap <= BATTERY_CAPACITY_WARN_PCT {
            esc.raise(Status::Warn)
                .advise("Consider replacing battery for optimal performance");
        }
        if cap <= BATTERY_CAPACITY_FAIL_PCT {
            esc.raise(Status::Fail)
                .advise("Battery replacement recommended soon");
        }
    }

    let charging = matches!(r.charge_state, ChargeState::Charging | ChargeState::Full);
    if r.level_percent.is_some_and(|l| l < BATTERY_LOW_LEVEL_PCT) && !charging {
        esc.advise("Battery level is low, consider charging");
    }

    explanation.push('.');
    Ok(esc.finish(explanation, BATTERY_CONFIDENCE))
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

pub fn storage(r: &StorageReading) -> DiagResult<Verdict> {
    let pct = r
        .usage_percent()
        .ok_or_else(|| DiagError::parse("could not compute usage: total capacity is zero"))?;
    let available_gb = r.available_kb as f64 / (1024.0 * 1024.0);

    let mut esc = Escalation::new();
    esc.raise(usage_band(pct, STORAGE_WARN_PCT, STORAGE_FAIL_PCT));
    if pct > STORAGE_ADVISE_PCT {
        esc.advise("Clear caches, temporary files, or unused apps");
    }
    if pct >= STORAGE_FAIL_PCT {
        esc.advise("Critical: Free up space immediately to avoid crashes");
    }

    let explanation = match esc.status() {
        Status::Pass => format!(
            "Storage usage is healthy at {:.1}%. {:.1} GB available.",
            pct, available_gb
        ),
        Status::Warn => format!(
            "Storage is getting full at {:.1}% usage. Consider cleanup.",
            pct
        ),
        _ => format!(
            "Storage is critically full at {:.1}% usage. Immediate cleanup needed.",
            pct
        ),
    };
    Ok(esc.finish(explanation, STORAGE_CONFIDENCE))
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

pub fn sensors(r: &SensorReading) -> DiagResult<Verdict> {
    let count = r.count();
    let mut esc = Escalation::new();

    let explanation = if count >= SENSORS_PASS_COUNT {
        let shown: Vec<&str> = r.sensors_found.iter().take(5).map(|s| s.as_str()).collect();
        format!(
            "Found {} sensors working properly: {}",
            count,
            shown.join(", ")
        )
    } else if count >= SENSORS_WARN_COUNT {
        esc.raise(Status::Warn);
        format!("Found {} sensors. Some sensors may not be available.", count)
    } else {
        esc.raise(Status::Fail)
            .advise("Check if device requires sensor calibration");
        format!(
            "Only {} sensors detected. Device may have sensor issues.",
            count
        )
    };
    Ok(esc.finish(explanation, SENSORS_CONFIDENCE))
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

pub fn network(r: &NetworkReading) -> DiagResult<Verdict> {
    let mut esc = Escalation::new();

    let explanation = if r.any_connected() {
        let mut text = String::from("Network connectivity is working.");
        if r.wifi_connected {
            text.push_str(" Wi-Fi connected.");
        }
        if r.mobile_data {
            text.push_str(" Mobile data available.");
        }
        if r.wired_connected {
            text.push_str(" Wired link up.");
        }
        text
    } else if r.wifi_enabled {
        esc.raise(Status::Warn);
        "Wi-Fi is enabled but not connected to a network.".to_string()
    } else {
        esc.raise(Status::Fail);
        "No network connectivity detected.".to_string()
    };

    if !r.any_connected() {
        esc.advise("Check Wi-Fi password or mobile data settings");
    }
    Ok(esc.finish(explanation, NETWORK_CONFIDENCE))
}

// ---------------------------------------------------------------------------
// CPU / memory
// ---------------------------------------------------------------------------

pub fn cpu(r: &CpuReading) -> DiagResult<Verdict> {
    let pct = r.usage_percent;
    let mut esc = Escalation::new();
    esc.raise(usage_band(pct, CPU_WARN_PCT, CPU_FAIL_PCT));
    if pct > CPU_ADVISE_PCT {
        esc.advise("Close unnecessary programs to reduce CPU load");
    }
    if pct >= CPU_FAIL_PCT {
        esc.advise("Critical: Check for malware or runaway processes");
    }

    let explanation = match esc.status() {
        Status::Pass => format!("CPU performance is normal. Current usage: {:.1}%", pct),
        Status::Warn => format!(
            "CPU usage is high at {:.1}%. Check for resource-heavy programs.",
            pct
        ),
        _ => format!(
            "CPU usage is critical at {:.1}%. System may be overloaded.",
            pct
        ),
    };
    Ok(esc.finish(explanation, CPU_CONFIDENCE))
}

pub fn memory(r: &MemoryReading) -> DiagResult<Verdict> {
    let pct = r
        .usage_percent()
        .ok_or_else(|| DiagError::parse("could not compute usage: total memory is zero"))?;
    let available_gb = r.available_kb as f64 / (1024.0 * 1024.0);

    let mut esc = Escalation::new();
    esc.raise(usage_band(pct, MEMORY_WARN_PCT, MEMORY_FAIL_PCT));
    if pct > MEMORY_ADVISE_PCT {
        esc.advise("Close unnecessary programs to free up memory");
    }
    if pct >= MEMORY_FAIL_PCT {
        esc.advise("Critical: System performance may be severely impacted");
    }

    let explanation = match esc.status() {
        Status::Pass => format!(
            "Memory usage is normal at {:.1}%. {:.1} GB available.",
            pct, available_gb
        ),
        Status::Warn => format!(
            "Memory usage is high at {:.1}%. Consider closing some programs.",
            pct
        ),
        _ => format!(
            "Memory usage is critical at {:.1}%. System may be slow.",
            pct
        ),
    };
    Ok(esc.finish(explanation, MEMORY_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_at(pct: u64) -> StorageReading {
        StorageReading {
            total_kb: 1000,
            used_kb: pct * 10,
            available_kb: 1000 - pct * 10,
        }
    }

    fn good_battery() -> BatteryReading {
        BatteryReading {
            level_percent: Some(80),
            health: BatteryHealth::Good,
            charge_state: ChargeState::Discharging,
            temperature_c: Some(30.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_storage_bands() {
        assert_eq!(storage(&storage_at(50)).unwrap().status, Status::Pass);
        assert_eq!(storage(&storage_at(82)).unwrap().status, Status::Warn);
        assert_eq!(storage(&storage_at(95)).unwrap().status, Status::Fail);
    }

    #[test]
    fn test_storage_advisories_accumulate() {
        let v = storage(&storage_at(95)).unwrap();
        assert_eq!(v.advisories.len(), 2);
        assert!(v.advisories[1].starts_with("Critical"));
        assert!(storage(&storage_at(50)).unwrap().advisories.is_empty());
    }

    #[test]
    fn test_storage_zero_total_is_error() {
        let err = storage(&StorageReading::default()).unwrap_err();
        assert!(matches!(err, DiagError::ParseFailure(ref m) if m.contains("could not compute usage")));
    }

    #[test]
    fn test_battery_good_and_cool_passes() {
        let v = battery(&good_battery()).unwrap();
        assert_eq!(v.status, Status::Pass);
        assert!(v.advisories.is_empty());
        assert_eq!(v.confidence, BATTERY_CONFIDENCE);
    }

    #[test]
    fn test_battery_high_temperature_warns_despite_good_health() {
        let r = BatteryReading {
            temperature_c: Some(45.0),
            ..good_battery()
        };
        let v = battery(&r).unwrap();
        assert_eq!(v.status, Status::Warn);
        assert!(v.advisories.iter().any(|a| a.contains("temperature is high")));
    }

    #[test]
    fn test_battery_overheating_fails_with_both_advisories() {
        let r = BatteryReading {
            temperature_c: Some(55.0),
            ..good_battery()
        };
        let v = battery(&r).unwrap();
        assert_eq!(v.status, Status::Fail);
        assert_eq!(v.advisories.len(), 2);
    }

    #[test]
    fn test_battery_fail_is_never_downgraded() {
        // Overheating fails first; a later mild capacity rule must not soften it.
        let r = BatteryReading {
            temperature_c: Some(55.0),
            max_capacity_percent: Some(75.0),
            ..good_battery()
        };
        let v = battery(&r).unwrap();
        assert_eq!(v.status, Status::Fail);
        assert_eq!(v.advisories.len(), 3);
    }

    #[test]
    fn test_battery_unknown_health_warns() {
        let r = BatteryReading {
            health: BatteryHealth::Unknown,
            ..good_battery()
        };
        let v = battery(&r).unwrap();
        assert_eq!(v.status, Status::Warn);
        assert!(v.explanation.contains("not optimal"));
    }

    #[test]
    fn test_battery_capacity_bands() {
        let at = |full| BatteryReading {
            design_capacity_mwh: Some(50_000),
            full_charge_capacity_mwh: Some(full),
            ..good_battery()
        };
        assert_eq!(battery(&at(42_000)).unwrap().status, Status::Pass);
        assert_eq!(battery(&at(35_000)).unwrap().status, Status::Warn);
        assert_eq!(battery(&at(25_000)).unwrap().status, Status::Fail);
    }

    #[test]
    fn test_battery_low_level_is_advisory_only() {
        let r = BatteryReading {
            level_percent: Some(10),
            ..good_battery()
        };
        let v = battery(&r).unwrap();
        assert_eq!(v.status, Status::Pass);
        assert_eq!(v.advisories, vec!["Battery level is low, consider charging"]);

        let charging = BatteryReading {
            charge_state: ChargeState::Charging,
            ..r
        };
        assert!(battery(&charging).unwrap().advisories.is_empty());
    }

    #[test]
    fn test_sensor_bands() {
        let with = |n: usize| SensorReading {
            sensors_found: (0..n).map(|i| format!("s{}", i)).collect(),
        };
        assert_eq!(sensors(&with(5)).unwrap().status, Status::Pass);
        assert_eq!(sensors(&with(4)).unwrap().status, Status::Warn);
        assert_eq!(sensors(&with(3)).unwrap().status, Status::Warn);
        let v = sensors(&with(2)).unwrap();
        assert_eq!(v.status, Status::Fail);
        assert_eq!(v.advisories.len(), 1);
    }

    #[test]
    fn test_network_states() {
        let connected = NetworkReading {
            wifi_enabled: true,
            wifi_connected: true,
            ..Default::default()
        };
        assert_eq!(network(&connected).unwrap().status, Status::Pass);

        let mobile = NetworkReading {
            mobile_data: true,
            ..Default::default()
        };
        assert_eq!(network(&mobile).unwrap().status, Status::Pass);

        let enabled = NetworkReading {
            wifi_enabled: true,
            ..Default::default()
        };
        let v = network(&enabled).unwrap();
        assert_eq!(v.status, Status::Warn);
        assert_eq!(v.advisories.len(), 1);

        assert_eq!(
            network(&NetworkReading::default()).unwrap().status,
            Status::Fail
        );
    }

    #[test]
    fn test_cpu_bands() {
        let at = |pct| CpuReading {
            usage_percent: pct,
            ..Default::default()
        };
        assert_eq!(cpu(&at(40.0)).unwrap().status, Status::Pass);
        assert_eq!(cpu(&at(85.0)).unwrap().status, Status::Warn);
        let v = cpu(&at(92.0)).unwrap();
        assert_eq!(v.status, Status::Warn);
        assert_eq!(v.advisories.len(), 1);
        assert_eq!(cpu(&at(97.0)).unwrap().status, Status::Fail);
    }

    #[test]
    fn test_memory_bands_and_zero_total() {
        let at = |avail| MemoryReading {
            total_kb: 1000,
            available_kb: avail,
        };
        assert_eq!(memory(&at(500)).unwrap().status, Status::Pass);
        assert_eq!(memory(&at(150)).unwrap().status, Status::Warn);
        assert_eq!(memory(&at(50)).unwrap().status, Status::Fail);
        assert!(memory(&MemoryReading::default()).is_err());
    }

    #[test]
    fn test_classification_is_idempotent() {
        let r = storage_at(87);
        assert_eq!(storage(&r).unwrap(), storage(&r).unwrap());
        let b = good_battery();
        assert_eq!(battery(&b).unwrap(), battery(&b).unwrap());
    }
}
