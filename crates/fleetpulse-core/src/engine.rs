//! The reconciliation engine.
//!
//! One run: fetch the fleet snapshot, fetch the compliance snapshot,
//! match and evaluate every fleet device, then submit a single bulk
//! health update. A transport error at any fetch or submit step aborts
//! the whole run; nothing is ever partially written.
//!
//! Runs are stateless and idempotent: with unchanged upstream data a
//! second run produces an identical payload and no transition events.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::api::{ComplianceApi, FleetApi};
use crate::error::Result;
use crate::evaluator::HealthEvaluator;
use crate::matcher::{match_device, MatchOutcome};
use crate::model::{CheckFailure, FleetDevice, Platform};

/// Upper bound on concurrent per-device failure lookups, to respect the
/// compliance service's rate limits.
pub const MAX_CONCURRENT_FAILURE_LOOKUPS: usize = 8;

/// Identifying fields of the device an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub serial: String,
    pub platform: Platform,
    pub username: String,
}

impl From<&FleetDevice> for DeviceRef {
    fn from(device: &FleetDevice) -> Self {
        DeviceRef {
            serial: device.serial.clone(),
            platform: device.platform,
            username: device.username.clone(),
        }
    }
}

/// Events emitted during a run. Emission is proportional to signal:
/// steady-state devices with a matched compliance record produce
/// nothing, while unmatched devices are surfaced on every run so
/// operators keep seeing "still no matching device" situations.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// No compliance device matched; the device is marked unhealthy
    NoMatchingDevice(DeviceRef),
    /// More than one compliance device matched — a data-quality
    /// problem upstream; treated like no match
    AmbiguousMatch {
        device: DeviceRef,
        candidates: usize,
    },
    /// Device transitioned unhealthy → healthy
    DeviceHealthy(DeviceRef),
    /// Device transitioned healthy → unhealthy; carries the titles of
    /// the currently-failing checks
    DeviceUnhealthy {
        device: DeviceRef,
        failing_checks: Vec<String>,
    },
    /// The fleet snapshot was empty; no update was submitted
    NothingToUpdate,
    /// The bulk update was accepted by the fleet service
    UpdateSubmitted { devices: usize },
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// The payload submitted to the fleet service (empty when the
    /// fleet snapshot was empty and nothing was submitted)
    pub payload: Vec<FleetDevice>,
    /// Ordered events emitted during the run
    pub events: Vec<RunEvent>,
}

impl RunReport {
    /// Devices whose health state changed this run.
    pub fn transitions(&self) -> usize {
        self.events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    RunEvent::DeviceHealthy(_) | RunEvent::DeviceUnhealthy { .. }
                )
            })
            .count()
    }
}

/// Orchestrates one reconciliation pass between the compliance service
/// and the fleet registry.
pub struct ReconciliationEngine<'a> {
    fleet: &'a dyn FleetApi,
    compliance: &'a dyn ComplianceApi,
    evaluator: HealthEvaluator,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        fleet: &'a dyn FleetApi,
        compliance: &'a dyn ComplianceApi,
        evaluator: HealthEvaluator,
    ) -> Self {
        ReconciliationEngine {
            fleet,
            compliance,
            evaluator,
        }
    }

    /// Execute one run against the given reference time.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let fleet_devices = self.fleet.list_devices().await?;
        let compliance_devices = self.compliance.list_devices().await?;

        info!(
            fleet_devices = fleet_devices.len(),
            compliance_devices = compliance_devices.len(),
            "fetched device snapshots"
        );

        let mut events = Vec::new();

        if fleet_devices.is_empty() {
            info!("no fleet devices to update");
            events.push(RunEvent::NothingToUpdate);
            return Ok(RunReport {
                payload: Vec::new(),
                events,
            });
        }

        let matches: Vec<MatchOutcome> = fleet_devices
            .iter()
            .map(|device| match_device(device, &compliance_devices))
            .collect();

        // Failure lookups are independent and read-only; run them
        // concurrently with a bounded pool, then restore fleet order.
        let mut failing: Vec<Option<Vec<CheckFailure>>> = vec![None; fleet_devices.len()];
        let lookups: Vec<(usize, Result<Vec<CheckFailure>>)> = stream::iter(
            matches
                .iter()
                .enumerate()
                .filter_map(|(idx, outcome)| outcome.device().map(|device| (idx, device))),
        )
        .map(|(idx, device)| {
            let evaluator = &self.evaluator;
            let compliance = self.compliance;
            async move {
                (
                    idx,
                    evaluator.failing_checks(compliance, device, now).await,
                )
            }
        })
        .buffer_unordered(MAX_CONCURRENT_FAILURE_LOOKUPS)
        .collect()
        .await;

        for (idx, result) in lookups {
            failing[idx] = Some(result?);
        }

        let mut payload = Vec::with_capacity(fleet_devices.len());

        for (idx, device) in fleet_devices.iter().enumerate() {
            let device_ref = DeviceRef::from(device);

            let is_healthy = match &matches[idx] {
                MatchOutcome::NoMatch => {
                    warn!(
                        serial = %device_ref.serial,
                        platform = %device_ref.platform,
                        username = %device_ref.username,
                        "could not find matching compliance device"
                    );
                    events.push(RunEvent::NoMatchingDevice(device_ref));
                    false
                }
                MatchOutcome::Ambiguous(candidates) => {
                    warn!(
                        serial = %device_ref.serial,
                        platform = %device_ref.platform,
                        username = %device_ref.username,
                        candidates,
                        "multiple compliance devices matched"
                    );
                    events.push(RunEvent::AmbiguousMatch {
                        device: device_ref,
                        candidates: *candidates,
                    });
                    false
                }
                MatchOutcome::Unique(_) => {
                    let failing_checks = failing[idx].take().unwrap_or_default();
                    let is_healthy = failing_checks.is_empty();

                    if is_healthy && !device.is_healthy {
                        info!(
                            serial = %device_ref.serial,
                            platform = %device_ref.platform,
                            username = %device_ref.username,
                            "no failing checks anymore, device is now healthy"
                        );
                        events.push(RunEvent::DeviceHealthy(device_ref));
                    } else if !is_healthy && device.is_healthy {
                        let titles: Vec<String> = failing_checks
                            .iter()
                            .map(|failure| failure.title.clone())
                            .collect();
                        info!(
                            serial = %device_ref.serial,
                            platform = %device_ref.platform,
                            username = %device_ref.username,
                            failing_checks = titles.join(", "),
                            "device is no longer healthy"
                        );
                        events.push(RunEvent::DeviceUnhealthy {
                            device: device_ref,
                            failing_checks: titles,
                        });
                    }

                    is_healthy
                }
            };

            payload.push(device.with_health(is_healthy));
        }

        self.fleet.update_devices(&payload).await?;

        info!(devices = payload.len(), "sent updated device configuration");
        events.push(RunEvent::UpdateSubmitted {
            devices: payload.len(),
        });

        Ok(RunReport { payload, events })
    }
}
