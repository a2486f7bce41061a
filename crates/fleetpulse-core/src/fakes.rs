//! In-memory fakes for the client traits (testing only).
//!
//! `MemoryComplianceApi` and `MemoryFleetApi` satisfy the trait
//! contracts without any network access. The compliance fake counts
//! failure lookups so tests can assert the failures endpoint is never
//! hit for devices with no unresolved failures, and the fleet fake
//! records every submitted payload.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ComplianceApi, FleetApi};
use crate::error::{Error, Result};
use crate::model::{CheckFailure, ComplianceCheck, ComplianceDevice, FleetDevice};

// ---------------------------------------------------------------------------
// MemoryComplianceApi
// ---------------------------------------------------------------------------

/// In-memory compliance service backed by fixed device and failure
/// lists.
#[derive(Debug, Default)]
pub struct MemoryComplianceApi {
    devices: Vec<ComplianceDevice>,
    checks: Vec<ComplianceCheck>,
    failures: HashMap<i64, Vec<CheckFailure>>,
    failure_lookups: AtomicUsize,
    fail_transport: bool,
}

impl MemoryComplianceApi {
    pub fn new(devices: Vec<ComplianceDevice>) -> Self {
        MemoryComplianceApi {
            devices,
            ..Default::default()
        }
    }

    /// Register the failure list returned for one device id.
    pub fn with_failures(mut self, device_id: i64, failures: Vec<CheckFailure>) -> Self {
        self.failures.insert(device_id, failures);
        self
    }

    pub fn with_checks(mut self, checks: Vec<ComplianceCheck>) -> Self {
        self.checks = checks;
        self
    }

    /// Make every call fail with a transport error.
    pub fn with_transport_failure(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// Number of `list_device_failures` calls made so far.
    pub fn failure_lookups(&self) -> usize {
        self.failure_lookups.load(Ordering::SeqCst)
    }

    fn check_transport(&self) -> Result<()> {
        if self.fail_transport {
            return Err(Error::UnexpectedStatus {
                service: "compliance service",
                status: reqwest::StatusCode::BAD_GATEWAY,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ComplianceApi for MemoryComplianceApi {
    async fn list_devices(&self) -> Result<Vec<ComplianceDevice>> {
        self.check_transport()?;
        Ok(self.devices.clone())
    }

    async fn list_device_failures(&self, device_id: i64) -> Result<Vec<CheckFailure>> {
        self.check_transport()?;
        self.failure_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.failures.get(&device_id).cloned().unwrap_or_default())
    }

    async fn list_checks(&self) -> Result<Vec<ComplianceCheck>> {
        self.check_transport()?;
        Ok(self.checks.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryFleetApi
// ---------------------------------------------------------------------------

/// In-memory fleet registry that records every bulk update it receives.
#[derive(Debug, Default)]
pub struct MemoryFleetApi {
    devices: Vec<FleetDevice>,
    updates: Mutex<Vec<Vec<FleetDevice>>>,
    fail_transport: bool,
}

impl MemoryFleetApi {
    pub fn new(devices: Vec<FleetDevice>) -> Self {
        MemoryFleetApi {
            devices,
            ..Default::default()
        }
    }

    /// Make every call fail with a transport error.
    pub fn with_transport_failure(mut self) -> Self {
        self.fail_transport = true;
        self
    }

    /// All bulk update payloads submitted so far, in order.
    pub fn submitted_updates(&self) -> Vec<Vec<FleetDevice>> {
        self.updates.lock().unwrap().clone()
    }

    fn check_transport(&self) -> Result<()> {
        if self.fail_transport {
            return Err(Error::UnexpectedStatus {
                service: "fleet service",
                status: reqwest::StatusCode::BAD_GATEWAY,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FleetApi for MemoryFleetApi {
    async fn list_devices(&self) -> Result<Vec<FleetDevice>> {
        self.check_transport()?;
        Ok(self.devices.clone())
    }

    async fn update_devices(&self, devices: &[FleetDevice]) -> Result<()> {
        self.check_transport()?;
        self.updates.lock().unwrap().push(devices.to_vec());
        Ok(())
    }
}
