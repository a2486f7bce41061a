//! Domain records for both sides of the reconciliation.
//!
//! `FleetDevice` is the fleet registry's view (camelCase JSON), while
//! `ComplianceDevice`, `CheckFailure` and `ComplianceCheck` mirror the
//! compliance service's snake_case payloads. Records are deserialized
//! once at the client boundary; loosely-typed maps never cross into the
//! evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device platform as tracked by the fleet registry.
///
/// The fleet registry only knows these three values. The compliance
/// service reports free-form platform strings ("ubuntu", "rhel", ...)
/// which [`Platform::normalize`] folds into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    Linux,
    Windows,
}

impl Platform {
    /// Normalize a raw compliance-side platform string.
    ///
    /// Anything that is not "darwin" or "windows" (case-insensitive) is
    /// assumed to be a Linux distribution.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "darwin" => Platform::Darwin,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    /// Lowercase name, matching the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One device enrolled in the fleet registry.
///
/// Refreshed from the fleet service every run and never persisted by
/// this crate; updates are expressed by producing a new record with a
/// recomputed `is_healthy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetDevice {
    /// Case-insensitive comparison key
    pub serial: String,
    pub platform: Platform,
    /// Owner identity, email-like, case-insensitive
    pub username: String,
    pub is_healthy: bool,
    /// Advisory only; passed through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl FleetDevice {
    /// Produce the updated record submitted back to the fleet service.
    pub fn with_health(&self, is_healthy: bool) -> FleetDevice {
        FleetDevice {
            is_healthy,
            ..self.clone()
        }
    }
}

/// Owner assignment on a compliance device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOwner {
    #[serde(default)]
    pub email: String,
}

/// One device tracked by the compliance service. Read-only snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDevice {
    /// Compliance-service-local identifier
    pub id: i64,
    #[serde(default)]
    pub serial: String,
    /// Raw platform string; normalize before comparing
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub assigned_owner: DeviceOwner,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub resolved_failure_count: u64,
}

impl ComplianceDevice {
    /// Whether the snapshot reports any unresolved failures at all.
    ///
    /// Used as a cheap pre-filter so the failures endpoint is only hit
    /// for devices that can actually be unhealthy.
    pub fn has_unresolved_failures(&self) -> bool {
        self.failure_count > self.resolved_failure_count
    }
}

/// One occurrence of a failing check on a compliance device.
///
/// Upstream data is unreliable, so every field except `check_id` is
/// defensively defaulted: a missing `resolved_at` means the failure is
/// still open, and a missing `timestamp` is treated as "just observed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check_id: i64,
    #[serde(default)]
    pub title: String,
    /// Instant the failure was first observed
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Present ⇒ the failure is no longer active
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CheckFailure {
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

/// A check definition as listed by the compliance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub failing_device_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}
