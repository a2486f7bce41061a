//! Fleetpulse core library
//!
//! Reconciles device health state between the endpoint-compliance
//! service (security checks per managed device) and the fleet registry
//! (which devices are allowed network access). Each run fetches both
//! snapshots, resolves device identity across the two systems, applies
//! the per-check criticality policy against a reference time, and
//! submits one idempotent bulk health update.

pub mod api;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod fakes;
pub mod matcher;
pub mod model;
pub mod policy;
pub mod telemetry;

pub use api::{
    ComplianceApi, ComplianceClient, ComplianceConfig, FleetApi, FleetClient, FleetConfig,
};
pub use engine::{
    DeviceRef, ReconciliationEngine, RunEvent, RunReport, MAX_CONCURRENT_FAILURE_LOOKUPS,
};
pub use error::{Error, Result};
pub use evaluator::HealthEvaluator;
pub use matcher::{match_device, MatchOutcome};
pub use model::{
    CheckFailure, ComplianceCheck, ComplianceDevice, DeviceOwner, FleetDevice, Platform,
};
pub use policy::{Criticality, CriticalityPolicy};
pub use telemetry::init_tracing;

/// Fleetpulse version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
