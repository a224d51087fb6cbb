//! Per-platform test catalogs.
//!
//! Each platform owns a fixed table mapping test id to the probes it needs
//! and the extractor + classifier pair that evaluates them. Lookups are
//! pure; an id missing from the table is reported by the runner as an
//! unimplemented test rather than failing the batch.

use crate::classify::{self, Verdict};
use crate::error::DiagResult;
use crate::extract::{self, key, Reading};
use crate::probes::{Invocation, ProbeSpec, Transcript};
use crate::types::{Category, Metrics};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Platforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Android,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform: {0} (available: windows, macos, android)")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" | "win" => Ok(Platform::Windows),
            "macos" | "darwin" | "mac" | "osx" => Ok(Platform::MacOs),
            "android" | "adb" => Ok(Platform::Android),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Android => "android",
        }
    }

    /// Platform to diagnose from this host. A Linux host is assumed to be
    /// driving an Android device over adb.
    pub fn detect() -> Option<Platform> {
        match std::env::consts::OS {
            "windows" => Some(Platform::Windows),
            "macos" => Some(Platform::MacOs),
            "linux" => Some(Platform::Android),
            _ => None,
        }
    }

    /// Whether a transport must be reachable before any probe runs.
    pub fn transport_gated(&self) -> bool {
        matches!(self, Platform::Android)
    }

    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            Platform::Windows | Platform::MacOs => {
                &["battery", "storage", "cpu", "memory", "network"]
            }
            Platform::Android => &["battery", "storage", "sensors", "memory", "network"],
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Extracted metrics together with their verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub metrics: Metrics,
    pub verdict: Verdict,
}

/// Evaluates the transcript of one test.
pub type Evaluator = fn(&Transcript) -> DiagResult<Assessment>;

pub struct TestEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub probes: &'static [ProbeSpec],
    pub evaluate: Evaluator,
}

impl std::fmt::Debug for TestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEntry")
            .field("id", &self.id)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Public listing of a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDescriptor {
    pub id: String,
    pub name: String,
    pub category: Category,
}

/// Run an extractor, then classify its reading.
pub fn assess<R: Reading>(
    t: &Transcript,
    extract: fn(&Transcript) -> DiagResult<R>,
    classify: fn(&R) -> DiagResult<Verdict>,
) -> DiagResult<Assessment> {
    let reading = extract(t)?;
    let verdict = classify(&reading)?;
    Ok(Assessment {
        metrics: reading.metrics(),
        verdict,
    })
}

pub fn catalog(platform: Platform) -> &'static [TestEntry] {
    match platform {
        Platform::Windows => WINDOWS,
        Platform::MacOs => MACOS,
        Platform::Android => ANDROID,
    }
}

pub fn lookup(platform: Platform, test_id: &str) -> Option<&'static TestEntry> {
    catalog(platform).iter().find(|e| e.id == test_id)
}

pub fn describe(platform: Platform) -> Vec<TestDescriptor> {
    catalog(platform)
        .iter()
        .map(|e| TestDescriptor {
            id: e.id.to_string(),
            name: e.name.to_string(),
            category: e.category,
        })
        .collect()
}

/// Every test id of a platform, in catalog order.
pub fn all_ids(platform: Platform) -> Vec<String> {
    catalog(platform).iter().map(|e| e.id.to_string()).collect()
}

const fn required(key: &'static str, candidates: &'static [Invocation]) -> ProbeSpec {
    ProbeSpec {
        key,
        candidates,
        required: true,
    }
}

const fn optional(key: &'static str, candidates: &'static [Invocation]) -> ProbeSpec {
    ProbeSpec {
        key,
        candidates,
        required: false,
    }
}

// ===========================================================================
// Android – adb shell
// ===========================================================================

const ADB_BATTERY: &[Invocation] = &[Invocation::new("adb", &["shell", "dumpsys", "battery"])];
const ADB_DF: &[Invocation] = &[
    Invocation::new("adb", &["shell", "df", "/data"]),
    Invocation::new("adb", &["shell", "df", "/storage/emulated"]),
];
const ADB_SENSORS: &[Invocation] = &[Invocation::new(
    "adb",
    &["shell", "dumpsys", "sensorservice"],
)];
const ADB_WIFI: &[Invocation] = &[Invocation::new("adb", &["shell", "dumpsys", "wifi"])];
const ADB_TELEPHONY: &[Invocation] = &[Invocation::new(
    "adb",
    &["shell", "dumpsys", "telephony.registry"],
)];
const ADB_MEMINFO: &[Invocation] = &[Invocation::new("adb", &["shell", "cat", "/proc/meminfo"])];

fn android_battery(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::android_battery, classify::battery)
}

fn android_storage(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::android_storage, classify::storage)
}

fn android_sensors(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::android_sensors, classify::sensors)
}

fn android_network(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::android_network, classify::network)
}

fn android_memory(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::android_memory, classify::memory)
}

static ANDROID: &[TestEntry] = &[
    TestEntry {
        id: "battery.health",
        name: "Battery Health Check",
        category: Category::Power,
        probes: &[required(key::BATTERY, ADB_BATTERY)],
        evaluate: android_battery,
    },
    TestEntry {
        id: "storage.health",
        name: "Storage Health",
        category: Category::Storage,
        probes: &[required(key::DISK, ADB_DF)],
        evaluate: android_storage,
    },
    TestEntry {
        id: "sensors.test",
        name: "Sensor Check",
        category: Category::Sensors,
        probes: &[required(key::SENSORS, ADB_SENSORS)],
        evaluate: android_sensors,
    },
    TestEntry {
        id: "network.connectivity",
        name: "Network Connectivity",
        category: Category::Network,
        probes: &[
            required(key::WIFI, ADB_WIFI),
            optional(key::TELEPHONY, ADB_TELEPHONY),
        ],
        evaluate: android_network,
    },
    TestEntry {
        id: "memory.test",
        name: "RAM Health Check",
        category: Category::Performance,
        probes: &[required(key::MEMORY, ADB_MEMINFO)],
        evaluate: android_memory,
    },
];

// ===========================================================================
// Windows – PowerShell / CIM
// ===========================================================================

const PS_BATTERY: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-CimInstance Win32_Battery | Format-List EstimatedChargeRemaining,BatteryStatus,Status",
    ],
)];
const PS_DESIGN_CAPACITY: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "(Get-CimInstance -Namespace root\\wmi -ClassName BatteryStaticData).DesignedCapacity",
    ],
)];
const PS_FULL_CAPACITY: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "(Get-CimInstance -Namespace root\\wmi -ClassName BatteryFullChargedCapacity).FullChargedCapacity",
    ],
)];
const PS_DISK: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-CimInstance Win32_LogicalDisk | Where-Object DeviceID -eq 'C:' | Format-List Size,FreeSpace",
    ],
)];
const PS_CPU: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-CimInstance Win32_Processor | Format-List LoadPercentage,NumberOfLogicalProcessors,CurrentClockSpeed",
    ],
)];
const PS_MEMORY: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-CimInstance Win32_OperatingSystem | Format-List TotalVisibleMemorySize,FreePhysicalMemory",
    ],
)];
const PS_ADAPTERS: &[Invocation] = &[Invocation::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "Get-NetAdapter -Physical | Format-List Name,Status,MediaType",
    ],
)];

fn windows_battery(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::windows_battery, classify::battery)
}

fn windows_storage(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::windows_storage, classify::storage)
}

fn windows_cpu(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::windows_cpu, classify::cpu)
}

fn windows_memory(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::windows_memory, classify::memory)
}

fn windows_network(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::windows_network, classify::network)
}

static WINDOWS: &[TestEntry] = &[
    TestEntry {
        id: "battery.health",
        name: "Battery Health Check",
        category: Category::Power,
        probes: &[
            required(key::BATTERY, PS_BATTERY),
            optional(key::DESIGN_CAPACITY, PS_DESIGN_CAPACITY),
            optional(key::FULL_CAPACITY, PS_FULL_CAPACITY),
        ],
        evaluate: windows_battery,
    },
    TestEntry {
        id: "storage.health",
        name: "Storage Health",
        category: Category::Storage,
        probes: &[required(key::DISK, PS_DISK)],
        evaluate: windows_storage,
    },
    TestEntry {
        id: "cpu.temperature",
        name: "CPU Load Check",
        category: Category::Performance,
        probes: &[required(key::CPU, PS_CPU)],
        evaluate: windows_cpu,
    },
    TestEntry {
        id: "memory.test",
        name: "RAM Health Check",
        category: Category::Performance,
        probes: &[required(key::MEMORY, PS_MEMORY)],
        evaluate: windows_memory,
    },
    TestEntry {
        id: "network.connectivity",
        name: "Network Connectivity",
        category: Category::Network,
        probes: &[required(key::ADAPTERS, PS_ADAPTERS)],
        evaluate: windows_network,
    },
];

// ===========================================================================
// macOS
// ===========================================================================

const MAC_POWER: &[Invocation] = &[Invocation::new("system_profiler", &["SPPowerDataType"])];
const MAC_DF: &[Invocation] = &[Invocation::new("df", &["-k", "/"])];
const MAC_TOP: &[Invocation] = &[Invocation::new("top", &["-l", "1", "-n", "0"])];
const MAC_NCPU: &[Invocation] = &[Invocation::new("sysctl", &["-n", "hw.ncpu"])];
const MAC_VM_STAT: &[Invocation] = &[Invocation::new("vm_stat", &[])];
const MAC_MEMSIZE: &[Invocation] = &[Invocation::new("sysctl", &["-n", "hw.memsize"])];
const MAC_AIRPORT: &[Invocation] = &[Invocation::new(
    "networksetup",
    &["-getairportpower", "en0"],
)];
const MAC_WIFI_ADDRESS: &[Invocation] = &[Invocation::new("ipconfig", &["getifaddr", "en0"])];
const MAC_ROUTE: &[Invocation] = &[Invocation::new("route", &["-n", "get", "default"])];

fn macos_battery(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::macos_battery, classify::battery)
}

fn macos_storage(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::macos_storage, classify::storage)
}

fn macos_cpu(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::macos_cpu, classify::cpu)
}

fn macos_memory(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::macos_memory, classify::memory)
}

fn macos_network(t: &Transcript) -> DiagResult<Assessment> {
    assess(t, extract::macos_network, classify::network)
}

static MACOS: &[TestEntry] = &[
    TestEntry {
        id: "battery.health",
        name: "Battery Health Check",
        category: Category::Power,
        probes: &[required(key::BATTERY, MAC_POWER)],
        evaluate: macos_battery,
    },
    TestEntry {
        id: "storage.health",
        name: "Storage Health",
        category: Category::Storage,
        probes: &[required(key::DISK, MAC_DF)],
        evaluate: macos_storage,
    },
    TestEntry {
        id: "cpu.temperature",
        name: "CPU Load Check",
        category: Category::Performance,
        probes: &[required(key::CPU, MAC_TOP), optional(key::CORES, MAC_NCPU)],
        evaluate: macos_cpu,
    },
    TestEntry {
        id: "memory.test",
        name: "RAM Health Check",
        category: Category::Performance,
        probes: &[
            required(key::MEMORY, MAC_VM_STAT),
            required(key::MEMSIZE, MAC_MEMSIZE),
        ],
        evaluate: macos_memory,
    },
    TestEntry {
        id: "network.connectivity",
        name: "Network Connectivity",
        category: Category::Network,
        probes: &[
            required(key::AIRPORT, MAC_AIRPORT),
            optional(key::WIFI_ADDRESS, MAC_WIFI_ADDRESS),
            optional(key::DEFAULT_ROUTE, MAC_ROUTE),
        ],
        evaluate: macos_network,
    },
];
