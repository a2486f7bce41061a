//! Client abstractions for the two upstream services.
//!
//! - [`ComplianceApi`]: the endpoint-compliance service that tracks
//!   security checks and their failures per device.
//! - [`FleetApi`]: the fleet registry, the system of record for which
//!   devices are currently allowed network access.
//!
//! Both traits are async and transport-agnostic; reqwest-backed
//! implementations live in the submodules, and in-memory fakes for
//! testing live in [`crate::fakes`].

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CheckFailure, ComplianceCheck, ComplianceDevice, FleetDevice};

pub mod compliance;
pub mod fleet;

pub use compliance::{ComplianceClient, ComplianceConfig};
pub use fleet::{FleetClient, FleetConfig};

/// Read access to the compliance service.
///
/// Implementations follow pagination transparently; callers always see
/// the union of all pages. Transport problems surface as errors so the
/// reconciliation run can fail closed instead of producing a partial,
/// inconsistent update.
#[async_trait]
pub trait ComplianceApi: Send + Sync {
    /// All devices tracked by the compliance service.
    async fn list_devices(&self) -> Result<Vec<ComplianceDevice>>;

    /// All check failures recorded for one device, resolved or not.
    async fn list_device_failures(&self, device_id: i64) -> Result<Vec<CheckFailure>>;

    /// All check definitions assigned to the account.
    async fn list_checks(&self) -> Result<Vec<ComplianceCheck>>;
}

/// Access to the fleet registry's device health records.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// All enrolled devices with their current health state.
    async fn list_devices(&self) -> Result<Vec<FleetDevice>>;

    /// Submit the updated health records as one bulk write.
    ///
    /// The payload is a full replacement for every serial it contains;
    /// implementations must never fall back to per-device writes, so a
    /// mid-run failure cannot leave the registry half-updated.
    async fn update_devices(&self, devices: &[FleetDevice]) -> Result<()>;
}
