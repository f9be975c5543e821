//! API constants
//!
//! Every file endpoint lives under `/api/{API_VERSION}`.

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Current API version segment
pub const API_VERSION: &str = "v1";

/// Timeout applied to each readiness dependency check
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Versioned prefix, e.g. `/api/v1`
pub fn api_prefix() -> String {
    format!("{}/{}", API_BASE, API_VERSION)
}
