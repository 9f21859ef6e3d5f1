//! Descriptive device metadata attached to a session.
//!
//! None of these fields are authoritative; they only help a user recognise
//! their own sessions in a "manage your devices" view.

use serde::{Deserialize, Serialize};

/// Device metadata captured when a credential pair is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl DeviceInfo {
    /// Build device info from a raw `User-Agent` and client address,
    /// deriving a display name such as `"Chrome on macOS"`.
    pub fn from_request(user_agent: Option<&str>, ip_address: Option<&str>) -> Self {
        Self {
            device_name: user_agent.map(describe_user_agent),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        }
    }

    /// Fill any missing field from `previous`.
    ///
    /// Used on rotation so a refresh call without headers keeps the
    /// original session's description.
    pub fn or(self, previous: DeviceInfo) -> Self {
        Self {
            device_name: self.device_name.or(previous.device_name),
            ip_address: self.ip_address.or(previous.ip_address),
            user_agent: self.user_agent.or(previous.user_agent),
        }
    }
}

/// Produce a short human-readable name for a `User-Agent` string.
pub fn describe_user_agent(user_agent: &str) -> String {
    format!("{} on {}", detect_browser(user_agent), detect_os(user_agent))
}

fn detect_browser(ua: &str) -> &'static str {
    let ua = ua.to_lowercase();

    // Order matters: Edge and Opera advertise Chrome, Chrome advertises Safari.
    if ua.contains("edg/") || ua.contains("edge/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("chrome/") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else if ua.contains("firefox/") {
        "Firefox"
    } else {
        "Unknown Browser"
    }
}

fn detect_os(ua: &str) -> &'static str {
    let ua = ua.to_lowercase();

    if ua.contains("iphone") {
        "iOS"
    } else if ua.contains("ipad") {
        "iPadOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("windows") {
        "Windows"
    } else if ua.contains("mac os x") || ua.contains("macintosh") {
        "macOS"
    } else if ua.contains("cros") {
        "Chrome OS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown OS"
    }
}
