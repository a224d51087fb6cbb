//! Output extractors – raw probe text to typed readings.
//!
//! Parsing is lenient: a missing secondary field falls back to a documented
//! default and non-numeric text in a numeric field reads as 0. Extraction
//! fails only when the primary figure of a reading is absent altogether
//! (no storage line, no memory total, no battery block).

use crate::error::{DiagError, DiagResult};
use crate::probes::Transcript;
use crate::types::Metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transcript keys shared between catalog probe plans and extractors.
pub mod key {
    pub const BATTERY: &str = "battery";
    pub const DESIGN_CAPACITY: &str = "design_capacity";
    pub const FULL_CAPACITY: &str = "full_capacity";
    pub const DISK: &str = "disk";
    pub const SENSORS: &str = "sensors";
    pub const WIFI: &str = "wifi";
    pub const TELEPHONY: &str = "telephony";
    pub const ADAPTERS: &str = "adapters";
    pub const AIRPORT: &str = "airport";
    pub const WIFI_ADDRESS: &str = "wifi_address";
    pub const DEFAULT_ROUTE: &str = "default_route";
    pub const CPU: &str = "cpu";
    pub const CORES: &str = "cores";
    pub const MEMORY: &str = "memory";
    pub const MEMSIZE: &str = "memsize";
}

const KB_PER_GB: f64 = 1024.0 * 1024.0;

/// Anything that can be reported as outcome metrics.
pub trait Reading {
    fn metrics(&self) -> Metrics;
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Split `key<sep>value` lines. Keys are lower-cased and trimmed; the first
/// occurrence of a key wins. Lines without the separator are ignored.
pub fn parse_key_values(text: &str, sep: char) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        if let Some((k, v)) = line.split_once(sep) {
            let k = k.trim().to_lowercase();
            if k.is_empty() {
                continue;
            }
            out.entry(k).or_insert_with(|| v.trim().to_string());
        }
    }
    out
}

/// Like [`parse_key_values`] but one map per blank-line separated block,
/// as printed by `Format-List` for multiple objects.
pub fn parse_blocks(text: &str, sep: char) -> Vec<HashMap<String, String>> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(parse_key_values(&current, sep));
                current.clear();
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        blocks.push(parse_key_values(&current, sep));
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Leading decimal number of `raw`, ignoring trailing units (`%`, `.`, ` MHz`).
pub fn leading_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].trim_end_matches('.').parse().ok()
}

/// Lenient float coercion: anything unparseable reads as 0.
pub fn parse_number(raw: &str) -> f64 {
    leading_number(raw).unwrap_or(0.0)
}

/// Lenient unsigned coercion for byte and block counts.
pub fn parse_count(raw: &str) -> u64 {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// First whitespace-separated token of `text` that is a number.
pub fn first_number(text: &str) -> Option<f64> {
    text.split_whitespace().find_map(leading_number)
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn is_yes(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "yes" | "true" | "on")
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryHealth {
    Good,
    Degraded,
    Overheat,
    Dead,
    OverVoltage,
    Cold,
    Failure,
    Unknown,
}

impl BatteryHealth {
    /// Android `BatteryManager.BATTERY_HEALTH_*` codes.
    pub fn from_android_code(code: i64) -> Self {
        match code {
            2 => BatteryHealth::Good,
            3 => BatteryHealth::Overheat,
            4 => BatteryHealth::Dead,
            5 => BatteryHealth::OverVoltage,
            6 => BatteryHealth::Failure,
            7 => BatteryHealth::Cold,
            _ => BatteryHealth::Unknown,
        }
    }

    /// Vendor wording (`Good`, `OK`, `Normal`, `Replace Soon`, ...).
    pub fn from_text(raw: &str) -> Self {
        if let Ok(code) = raw.trim().parse::<i64>() {
            return Self::from_android_code(code);
        }
        match raw.trim().to_lowercase().as_str() {
            "good" | "ok" | "normal" => BatteryHealth::Good,
            "degraded" | "replace soon" | "pred fail" => BatteryHealth::Degraded,
            "overheat" => BatteryHealth::Overheat,
            "dead" => BatteryHealth::Dead,
            "over voltage" | "over_voltage" => BatteryHealth::OverVoltage,
            "cold" => BatteryHealth::Cold,
            "failure" | "unspecified failure" | "error" | "replace now" | "service battery" => {
                BatteryHealth::Failure
            }
            _ => BatteryHealth::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryHealth::Good => "good",
            BatteryHealth::Degraded => "degraded",
            BatteryHealth::Overheat => "overheat",
            BatteryHealth::Dead => "dead",
            BatteryHealth::OverVoltage => "over_voltage",
            BatteryHealth::Cold => "cold",
            BatteryHealth::Failure => "failure",
            BatteryHealth::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeState {
    Charging,
    Discharging,
    NotCharging,
    Full,
    Unknown,
}

impl ChargeState {
    /// Android `BatteryManager.BATTERY_STATUS_*` codes.
    pub fn from_android_code(code: i64) -> Self {
        match code {
            2 => ChargeState::Charging,
            3 => ChargeState::Discharging,
            4 => ChargeState::NotCharging,
            5 => ChargeState::Full,
            _ => ChargeState::Unknown,
        }
    }

    /// `Win32_Battery.BatteryStatus` codes.
    pub fn from_windows_code(code: i64) -> Self {
        match code {
            1 | 4 | 5 => ChargeState::Discharging,
            2 | 11 => ChargeState::NotCharging,
            3 => ChargeState::Full,
            6..=9 => ChargeState::Charging,
            _ => ChargeState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Charging => "charging",
            ChargeState::Discharging => "discharging",
            ChargeState::NotCharging => "not_charging",
            ChargeState::Full => "full",
            ChargeState::Unknown => "unknown",
        }
    }
}

/// Battery facts. Absent fields are `None` and trigger no rule; the
/// health flag defaults to `Unknown`, the charge state to `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryReading {
    pub level_percent: Option<i64>,
    pub health: BatteryHealth,
    pub charge_state: ChargeState,
    pub temperature_c: Option<f64>,
    pub voltage_mv: Option<i64>,
    pub cycle_count: Option<i64>,
    pub design_capacity_mwh: Option<i64>,
    pub full_charge_capacity_mwh: Option<i64>,
    /// Capacity health reported directly by the OS, in percent.
    pub max_capacity_percent: Option<f64>,
}

impl Default for BatteryReading {
    fn default() -> Self {
        Self {
            level_percent: None,
            health: BatteryHealth::Unknown,
            charge_state: ChargeState::Unknown,
            temperature_c: None,
            voltage_mv: None,
            cycle_count: None,
            design_capacity_mwh: None,
            full_charge_capacity_mwh: None,
            max_capacity_percent: None,
        }
    }
}

impl BatteryReading {
    /// Remaining capacity relative to design, in percent.
    pub fn capacity_health_percent(&self) -> Option<f64> {
        match (self.full_charge_capacity_mwh, self.design_capacity_mwh) {
            (Some(full), Some(design)) if design > 0 => {
                Some(round1(full as f64 / design as f64 * 100.0))
            }
            _ => self.max_capacity_percent,
        }
    }
}

impl Reading for BatteryReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("health".into(), self.health.as_str().into());
        m.insert("charge_state".into(), self.charge_state.as_str().into());
        if let Some(v) = self.level_percent {
            m.insert("level_percentage".into(), v.into());
        }
        if let Some(v) = self.temperature_c {
            m.insert("temperature_celsius".into(), round1(v).into());
        }
        if let Some(v) = self.voltage_mv {
            m.insert("voltage_mv".into(), v.into());
        }
        if let Some(v) = self.cycle_count {
            m.insert("cycle_count".into(), v.into());
        }
        if let Some(v) = self.design_capacity_mwh {
            m.insert("design_capacity_mwh".into(), v.into());
        }
        if let Some(v) = self.full_charge_capacity_mwh {
            m.insert("full_charge_capacity_mwh".into(), v.into());
        }
        if let Some(v) = self.capacity_health_percent() {
            m.insert("capacity_health_percentage".into(), v.into());
        }
        m
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageReading {
    pub total_kb: u64,
    pub used_kb: u64,
    pub available_kb: u64,
}

impl StorageReading {
    /// `None` when the total is zero and no usage can be computed.
    pub fn usage_percent(&self) -> Option<f64> {
        (self.total_kb > 0).then(|| round1(self.used_kb as f64 / self.total_kb as f64 * 100.0))
    }
}

impl Reading for StorageReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("total_gb".into(), round1(self.total_kb as f64 / KB_PER_GB).into());
        m.insert("used_gb".into(), round1(self.used_kb as f64 / KB_PER_GB).into());
        m.insert(
            "available_gb".into(),
            round1(self.available_kb as f64 / KB_PER_GB).into(),
        );
        if let Some(pct) = self.usage_percent() {
            m.insert("usage_percentage".into(), pct.into());
        }
        m
    }
}

/// Parse one `df` data row: filesystem, total, used, available, ...
fn df_row(parts: &[&str]) -> Option<StorageReading> {
    if parts.len() < 4 {
        return None;
    }
    Some(StorageReading {
        total_kb: parse_count(parts[1]),
        used_kb: parse_count(parts[2]),
        available_kb: parse_count(parts[3]),
    })
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Sensor kinds looked for in sensor service dumps.
pub const COMMON_SENSORS: &[&str] = &[
    "accelerometer",
    "gyroscope",
    "magnetometer",
    "proximity",
    "light",
    "pressure",
    "temperature",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorReading {
    pub sensors_found: Vec<String>,
}

impl SensorReading {
    pub fn count(&self) -> usize {
        self.sensors_found.len()
    }
}

impl Reading for SensorReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("sensors_found".into(), self.sensors_found.clone().into());
        m.insert("sensor_count".into(), self.count().into());
        m
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Link state. Every flag defaults to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkReading {
    pub wifi_enabled: bool,
    pub wifi_connected: bool,
    pub mobile_data: bool,
    pub wired_connected: bool,
}

impl NetworkReading {
    pub fn any_connected(&self) -> bool {
        self.wifi_connected || self.mobile_data || self.wired_connected
    }
}

impl Reading for NetworkReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("wifi_enabled".into(), self.wifi_enabled.into());
        m.insert("wifi_connected".into(), self.wifi_connected.into());
        m.insert("mobile_data".into(), self.mobile_data.into());
        m.insert("wired_connected".into(), self.wired_connected.into());
        m
    }
}

// ---------------------------------------------------------------------------
// CPU / memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuReading {
    pub usage_percent: f64,
    pub logical_cores: Option<i64>,
    pub frequency_mhz: Option<f64>,
}

impl Reading for CpuReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("cpu_usage_percentage".into(), round1(self.usage_percent).into());
        if let Some(v) = self.logical_cores {
            m.insert("cpu_cores".into(), v.into());
        }
        if let Some(v) = self.frequency_mhz {
            m.insert("cpu_frequency_mhz".into(), round1(v).into());
        }
        m
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemoryReading {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.available_kb)
    }

    pub fn usage_percent(&self) -> Option<f64> {
        (self.total_kb > 0).then(|| round1(self.used_kb() as f64 / self.total_kb as f64 * 100.0))
    }
}

impl Reading for MemoryReading {
    fn metrics(&self) -> Metrics {
        let mut m = Metrics::new();
        m.insert("total_gb".into(), round1(self.total_kb as f64 / KB_PER_GB).into());
        m.insert("used_gb".into(), round1(self.used_kb() as f64 / KB_PER_GB).into());
        m.insert(
            "available_gb".into(),
            round1(self.available_kb as f64 / KB_PER_GB).into(),
        );
        if let Some(pct) = self.usage_percent() {
            m.insert("usage_percentage".into(), pct.into());
        }
        m
    }
}

// ===========================================================================
// Android (adb shell ...)
// ===========================================================================

pub fn android_battery(t: &Transcript) -> DiagResult<BatteryReading> {
    let kv = parse_key_values(t.require(key::BATTERY)?, ':');
    if !kv.contains_key("level") && !kv.contains_key("health") {
        return Err(DiagError::parse("no battery fields in dumpsys output"));
    }

    Ok(BatteryReading {
        level_percent: kv.get("level").map(|v| parse_number(v) as i64),
        health: kv
            .get("health")
            .map(|v| BatteryHealth::from_text(v))
            .unwrap_or(BatteryHealth::Unknown),
        charge_state: kv
            .get("status")
            .map(|v| ChargeState::from_android_code(parse_number(v) as i64))
            .unwrap_or(ChargeState::Unknown),
        // Reported in tenths of a degree.
        temperature_c: kv.get("temperature").map(|v| parse_number(v) / 10.0),
        voltage_mv: kv.get("voltage").map(|v| parse_number(v) as i64),
        ..Default::default()
    })
}

pub fn android_storage(t: &Transcript) -> DiagResult<StorageReading> {
    const MARKERS: &[&str] = &["/data", "userdata", "/storage/emulated"];
    t.require(key::DISK)?
        .lines()
        .skip(1)
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .filter(|parts| parts.iter().any(|p| MARKERS.iter().any(|m| p.contains(m))))
        .find_map(|parts| df_row(&parts))
        .ok_or_else(|| DiagError::parse("no data partition in df output"))
}

pub fn android_sensors(t: &Transcript) -> DiagResult<SensorReading> {
    let dump = t.require(key::SENSORS)?.to_lowercase();
    Ok(SensorReading {
        sensors_found: COMMON_SENSORS
            .iter()
            .filter(|s| dump.contains(*s))
            .map(|s| s.to_string())
            .collect(),
    })
}

pub fn android_network(t: &Transcript) -> DiagResult<NetworkReading> {
    let wifi = t.require(key::WIFI)?;
    Ok(NetworkReading {
        wifi_enabled: wifi.contains("Wi-Fi is enabled") || wifi.contains("mWifiEnabled: true"),
        wifi_connected: wifi.contains("CONNECTED/CONNECTED") || wifi.contains("state: CONNECTED"),
        mobile_data: t
            .get(key::TELEPHONY)
            .map(|s| s.contains("DATA_CONNECTED"))
            .unwrap_or(false),
        wired_connected: false,
    })
}

pub fn android_memory(t: &Transcript) -> DiagResult<MemoryReading> {
    let kv = parse_key_values(t.require(key::MEMORY)?, ':');
    let total_kb = kv
        .get("memtotal")
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("MemTotal missing from meminfo"))?;
    let available_kb = kv
        .get("memavailable")
        .or_else(|| kv.get("memfree"))
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("MemAvailable and MemFree missing from meminfo"))?;
    Ok(MemoryReading {
        total_kb,
        available_kb,
    })
}

// ===========================================================================
// Windows (PowerShell Format-List output)
// ===========================================================================

pub fn windows_battery(t: &Transcript) -> DiagResult<BatteryReading> {
    let kv = parse_key_values(t.require(key::BATTERY)?, ':');
    if !kv.contains_key("estimatedchargeremaining") {
        return Err(DiagError::parse("no battery detected"));
    }

    let design = t
        .get(key::DESIGN_CAPACITY)
        .and_then(first_number)
        .map(|v| v as i64)
        .filter(|v| *v > 0);
    let full = t
        .get(key::FULL_CAPACITY)
        .and_then(first_number)
        .map(|v| v as i64)
        .filter(|v| *v > 0);

    // Capacity health needs both figures; one alone is reported as neither.
    let (design_capacity_mwh, full_charge_capacity_mwh) = match (design, full) {
        (Some(d), Some(f)) => (Some(d), Some(f)),
        _ => (None, None),
    };

    Ok(BatteryReading {
        level_percent: kv
            .get("estimatedchargeremaining")
            .map(|v| parse_number(v) as i64),
        health: kv
            .get("status")
            .map(|v| BatteryHealth::from_text(v))
            .unwrap_or(BatteryHealth::Unknown),
        charge_state: kv
            .get("batterystatus")
            .map(|v| ChargeState::from_windows_code(parse_number(v) as i64))
            .unwrap_or(ChargeState::Unknown),
        design_capacity_mwh,
        full_charge_capacity_mwh,
        ..Default::default()
    })
}

pub fn windows_storage(t: &Transcript) -> DiagResult<StorageReading> {
    let kv = parse_key_values(t.require(key::DISK)?, ':');
    let size = kv
        .get("size")
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("disk size missing"))?;
    let free = kv
        .get("freespace")
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("disk free space missing"))?;
    let total_kb = size / 1024;
    let available_kb = free / 1024;
    Ok(StorageReading {
        total_kb,
        used_kb: total_kb.saturating_sub(available_kb),
        available_kb,
    })
}

pub fn windows_cpu(t: &Transcript) -> DiagResult<CpuReading> {
    let blocks = parse_blocks(t.require(key::CPU)?, ':');
    let loads: Vec<f64> = blocks
        .iter()
        .filter_map(|b| b.get("loadpercentage"))
        .map(|v| parse_number(v))
        .collect();
    if loads.is_empty() {
        return Err(DiagError::parse("LoadPercentage missing"));
    }
    let cores: i64 = blocks
        .iter()
        .filter_map(|b| b.get("numberoflogicalprocessors"))
        .map(|v| parse_number(v) as i64)
        .sum();
    Ok(CpuReading {
        usage_percent: loads.iter().sum::<f64>() / loads.len() as f64,
        logical_cores: (cores > 0).then_some(cores),
        frequency_mhz: blocks
            .first()
            .and_then(|b| b.get("currentclockspeed"))
            .map(|v| parse_number(v)),
    })
}

pub fn windows_memory(t: &Transcript) -> DiagResult<MemoryReading> {
    let kv = parse_key_values(t.require(key::MEMORY)?, ':');
    let total_kb = kv
        .get("totalvisiblememorysize")
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("TotalVisibleMemorySize missing"))?;
    let available_kb = kv
        .get("freephysicalmemory")
        .map(|v| parse_count(v))
        .ok_or_else(|| DiagError::parse("FreePhysicalMemory missing"))?;
    Ok(MemoryReading {
        total_kb,
        available_kb,
    })
}

pub fn windows_network(t: &Transcript) -> DiagResult<NetworkReading> {
    let mut reading = NetworkReading::default();
    for adapter in parse_blocks(t.require(key::ADAPTERS)?, ':') {
        let status = adapter.get("status").map(|s| s.to_lowercase()).unwrap_or_default();
        let media = adapter.get("mediatype").map(|s| s.to_lowercase()).unwrap_or_default();
        let up = status == "up";
        if media.contains("802.11") {
            reading.wifi_enabled |= status != "disabled";
            reading.wifi_connected |= up;
        } else if media.contains("802.3") {
            reading.wired_connected |= up;
        }
    }
    Ok(reading)
}

// ===========================================================================
// macOS
// ===========================================================================

pub fn macos_battery(t: &Transcript) -> DiagResult<BatteryReading> {
    let text = t.require(key::BATTERY)?;
    if !text.contains("Battery Information") {
        return Err(DiagError::parse("no battery detected"));
    }
    let kv = parse_key_values(text, ':');

    let charge_state = if kv.get("fully charged").map(|v| is_yes(v)).unwrap_or(false) {
        ChargeState::Full
    } else {
        match kv.get("charging") {
            Some(v) if is_yes(v) => ChargeState::Charging,
            Some(_) => ChargeState::Discharging,
            None => ChargeState::Unknown,
        }
    };

    Ok(BatteryReading {
        level_percent: kv
            .get("state of charge (%)")
            .map(|v| parse_number(v) as i64),
        health: kv
            .get("condition")
            .map(|v| BatteryHealth::from_text(v))
            .unwrap_or(BatteryHealth::Unknown),
        charge_state,
        cycle_count: kv.get("cycle count").map(|v| parse_number(v) as i64),
        max_capacity_percent: kv.get("maximum capacity").map(|v| parse_number(v)),
        ..Default::default()
    })
}

pub fn macos_storage(t: &Transcript) -> DiagResult<StorageReading> {
    t.require(key::DISK)?
        .lines()
        .skip(1)
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .filter(|parts| parts.last() == Some(&"/"))
        .find_map(|parts| df_row(&parts))
        .ok_or_else(|| DiagError::parse("root volume missing from df output"))
}

pub fn macos_cpu(t: &Transcript) -> DiagResult<CpuReading> {
    let line = t
        .require(key::CPU)?
        .lines()
        .find(|l| l.trim_start().starts_with("CPU usage"))
        .ok_or_else(|| DiagError::parse("CPU usage line missing from top output"))?;
    let idle = line
        .split(',')
        .find(|seg| seg.contains("idle"))
        .and_then(|seg| seg.split(':').next_back())
        .and_then(leading_number)
        .ok_or_else(|| DiagError::parse("idle figure missing from CPU usage line"))?;
    Ok(CpuReading {
        usage_percent: (100.0 - idle).clamp(0.0, 100.0),
        logical_cores: t.get(key::CORES).and_then(first_number).map(|v| v as i64),
        frequency_mhz: None,
    })
}

pub fn macos_memory(t: &Transcript) -> DiagResult<MemoryReading> {
    let total_bytes = first_number(t.require(key::MEMSIZE)?)
        .ok_or_else(|| DiagError::parse("hw.memsize is not a number"))?;
    let vm = t.require(key::MEMORY)?;
    let page_size = vm
        .split("page size of")
        .nth(1)
        .and_then(first_number)
        .unwrap_or(4096.0);
    let kv = parse_key_values(vm, ':');
    let pages = |name: &str| kv.get(name).map(|v| parse_number(v)).unwrap_or(0.0);
    let available_pages = pages("pages free") + pages("pages inactive") + pages("pages speculative");

    let total_kb = (total_bytes / 1024.0) as u64;
    Ok(MemoryReading {
        total_kb,
        available_kb: ((available_pages * page_size / 1024.0) as u64).min(total_kb),
    })
}

pub fn macos_network(t: &Transcript) -> DiagResult<NetworkReading> {
    let power = t.require(key::AIRPORT)?;
    let wifi_enabled = power
        .rsplit(':')
        .next()
        .map(|v| v.trim().eq_ignore_ascii_case("on"))
        .unwrap_or(false);
    let wifi_connected = wifi_enabled
        && t
            .get(key::WIFI_ADDRESS)
            .map(|addr| !addr.trim().is_empty())
            .unwrap_or(false);
    let route_iface = t
        .get(key::DEFAULT_ROUTE)
        .map(|r| parse_key_values(r, ':'))
        .and_then(|kv| kv.get("interface").cloned());
    Ok(NetworkReading {
        wifi_enabled,
        wifi_connected,
        mobile_data: false,
        wired_connected: route_iface
            .map(|iface| iface != "en0" && !iface.starts_with("utun"))
            .unwrap_or(false),
    })
}
