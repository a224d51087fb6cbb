//! Device detection – describe the device a run would diagnose.

use crate::catalog::Platform;
use crate::context::DiagContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DETECT_TIMEOUT: Duration = Duration::from_secs(10);
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Laptop,
    Mobile,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub device_class: DeviceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub os: String,
    pub os_version: String,
    pub platform: Option<Platform>,
    pub capabilities: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Detect the device behind `platform`, or the host's default target.
///
/// Best effort: anything that cannot be determined reads as "unknown".
pub async fn detect(ctx: &DiagContext, platform: Option<Platform>) -> DeviceInfo {
    let platform = platform.or_else(Platform::detect);
    let mut info = DeviceInfo {
        id: format!("device_{}", uuid::Uuid::new_v4().simple()),
        device_class: DeviceClass::Unknown,
        make: None,
        model: None,
        os: std::env::consts::OS.to_string(),
        os_version: UNKNOWN.to_string(),
        platform,
        capabilities: platform
            .map(|p| p.capabilities().iter().map(|c| c.to_string()).collect())
            .unwrap_or_default(),
        detected_at: Utc::now(),
    };

    match platform {
        Some(Platform::MacOs) => {
            info.device_class = DeviceClass::Laptop;
            info.os = "macos".into();
            info.os_version = query(ctx, "sw_vers", &["-productVersion"])
                .await
                .unwrap_or_else(|| UNKNOWN.into());
        }
        Some(Platform::Windows) => {
            info.device_class = DeviceClass::Laptop;
            info.os = "windows".into();
            info.os_version = query(ctx, "cmd", &["/c", "ver"])
                .await
                .map(|v| parse_windows_ver(&v))
                .unwrap_or_else(|| UNKNOWN.into());
        }
        Some(Platform::Android) => {
            info.device_class = DeviceClass::Mobile;
            info.os = "android".into();
            if ctx.transport().is_reachable().await {
                info.make = getprop(ctx, "ro.product.manufacturer").await;
                info.model = getprop(ctx, "ro.product.model").await;
                info.os_version = getprop(ctx, "ro.build.version.release")
                    .await
                    .unwrap_or_else(|| UNKNOWN.into());
            } else {
                tracing::warn!("android device unreachable; version unknown");
            }
        }
        None => {}
    }

    tracing::info!(
        device_class = ?info.device_class,
        os = %info.os,
        os_version = %info.os_version,
        "detected device"
    );
    info
}

async fn query(ctx: &DiagContext, program: &str, args: &[&str]) -> Option<String> {
    let out = ctx.gateway().invoke(program, args, DETECT_TIMEOUT).await;
    (out.succeeded() && !out.stdout.trim().is_empty()).then(|| out.stdout.trim().to_string())
}

async fn getprop(ctx: &DiagContext, prop: &str) -> Option<String> {
    query(ctx, "adb", &["shell", "getprop", prop]).await
}

/// `Microsoft Windows [Version 10.0.22631.4317]` → `10.0.22631.4317`.
fn parse_windows_ver(raw: &str) -> String {
    raw.split("Version")
        .nth(1)
        .map(|v| v.trim().trim_end_matches(']').trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| raw.trim().to_string())
}
