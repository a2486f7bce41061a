//! Health evaluation for a matched compliance device.
//!
//! A device is healthy when it has no currently-failing checks. A
//! failure counts as currently failing when it is unresolved, not
//! ignored, and either its check has zero grace time (fail on any
//! occurrence) or it is older than the check's grace time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::api::ComplianceApi;
use crate::error::Result;
use crate::model::{CheckFailure, ComplianceDevice};
use crate::policy::{Criticality, CriticalityPolicy};

/// Applies the criticality policy and a per-run ignore set to a
/// device's check failures.
#[derive(Debug, Clone)]
pub struct HealthEvaluator {
    policy: CriticalityPolicy,
    ignored: HashSet<i64>,
}

impl HealthEvaluator {
    /// Build an evaluator. `ignore_checks` is the per-run ignore list
    /// (from the CLI); it is merged with the policy's own Ignore
    /// entries.
    pub fn new(policy: CriticalityPolicy, ignore_checks: impl IntoIterator<Item = i64>) -> Self {
        let mut ignored: HashSet<i64> = policy.ignored_checks().collect();
        ignored.extend(ignore_checks);
        HealthEvaluator { policy, ignored }
    }

    /// Currently-failing checks for a matched compliance device.
    ///
    /// The failures endpoint is only queried when the device snapshot
    /// reports unresolved failures; otherwise the device is trivially
    /// healthy and the list is empty.
    pub async fn failing_checks(
        &self,
        compliance: &dyn ComplianceApi,
        device: &ComplianceDevice,
        now: DateTime<Utc>,
    ) -> Result<Vec<CheckFailure>> {
        if !device.has_unresolved_failures() {
            return Ok(Vec::new());
        }

        let failures = compliance.list_device_failures(device.id).await?;
        Ok(failures
            .into_iter()
            .filter(|failure| self.is_failing(failure, now))
            .collect())
    }

    /// Whether a single failure currently fails the device.
    ///
    /// A failure with no `timestamp` is treated as just observed (age
    /// zero): it fails a zero-grace check immediately but stays inside
    /// any positive grace window.
    pub fn is_failing(&self, failure: &CheckFailure, now: DateTime<Utc>) -> bool {
        if failure.is_resolved() {
            return false;
        }

        if self.ignored.contains(&failure.check_id) {
            return false;
        }

        match self.policy.grace_time(failure.check_id) {
            Criticality::Ignore => false,
            Criticality::Grace(grace) if grace.is_zero() => true,
            Criticality::Grace(grace) => {
                let observed_at = failure.timestamp.unwrap_or(now);
                now - observed_at > grace
            }
        }
    }
}
