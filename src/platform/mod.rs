//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger installation
//! - Wall clock (telemetry timestamps, record dates)
//! - Device detection
//! - Storage (LocalStorage on web, in-memory natively)

pub mod storage;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Install the logger for the current target
///
/// Safe to call more than once; later calls are ignored.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already installed");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Unix time in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current calendar date in UTC
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Device class a run was played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    #[default]
    Desktop,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Desktop => "desktop",
        }
    }

    /// Single-letter code used in share links
    pub fn code(&self) -> char {
        match self {
            Device::Mobile => 'm',
            Device::Desktop => 'd',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(Device::Mobile),
            "d" => Some(Device::Desktop),
            _ => None,
        }
    }
}

const MOBILE_AGENTS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Classify a browser user agent string
pub fn device_from_user_agent(user_agent: &str) -> Device {
    let ua = user_agent.to_lowercase();
    if MOBILE_AGENTS.iter().any(|agent| ua.contains(agent)) {
        Device::Mobile
    } else {
        Device::Desktop
    }
}

#[cfg(target_arch = "wasm32")]
pub fn detect_device() -> Device {
    web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .map(|ua| device_from_user_agent(&ua))
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn detect_device() -> Device {
    Device::Desktop
}
