//! Identity resolution between fleet and compliance device records.
//!
//! The two services share no primary key, so a fleet device is resolved
//! to a compliance device by (owner identity, serial, normalized
//! platform). Anything other than exactly one candidate is treated as
//! "no compliance data" — but zero and multiple candidates are reported
//! as distinct outcomes, since a multi-match usually points at a
//! data-quality problem in the compliance service.

use crate::model::{ComplianceDevice, FleetDevice, Platform};

/// Result of resolving one fleet device against the compliance snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// Exactly one compliance device matched
    Unique(&'a ComplianceDevice),
    /// No candidate matched
    NoMatch,
    /// More than one candidate matched; carries the candidate count
    Ambiguous(usize),
}

impl MatchOutcome<'_> {
    pub fn device(&self) -> Option<&ComplianceDevice> {
        match self {
            MatchOutcome::Unique(device) => Some(*device),
            _ => None,
        }
    }
}

/// Resolve a fleet device to at most one compliance device.
pub fn match_device<'a>(
    fleet_device: &FleetDevice,
    compliance_devices: &'a [ComplianceDevice],
) -> MatchOutcome<'a> {
    let candidates: Vec<&ComplianceDevice> = compliance_devices
        .iter()
        .filter(|candidate| {
            candidate
                .assigned_owner
                .email
                .eq_ignore_ascii_case(&fleet_device.username)
                && candidate.serial.eq_ignore_ascii_case(&fleet_device.serial)
                && Platform::normalize(&candidate.platform) == fleet_device.platform
        })
        .collect();

    match candidates.as_slice() {
        [] => MatchOutcome::NoMatch,
        [device] => MatchOutcome::Unique(device),
        multiple => MatchOutcome::Ambiguous(multiple.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceOwner;

    fn fleet_device(serial: &str, platform: Platform, username: &str) -> FleetDevice {
        FleetDevice {
            serial: serial.into(),
            platform,
            username: username.into(),
            is_healthy: true,
            last_seen: None,
        }
    }

    fn compliance_device(id: i64, serial: &str, platform: &str, email: &str) -> ComplianceDevice {
        ComplianceDevice {
            id,
            serial: serial.into(),
            platform: platform.into(),
            assigned_owner: DeviceOwner {
                email: email.into(),
            },
            failure_count: 0,
            resolved_failure_count: 0,
        }
    }

    #[test]
    fn unique_match_is_returned() {
        let fleet = fleet_device("serial1", Platform::Linux, "user@example.com");
        let candidates = vec![
            compliance_device(1, "serial1", "ubuntu", "user@example.com"),
            compliance_device(2, "serial2", "ubuntu", "user@example.com"),
        ];

        let outcome = match_device(&fleet, &candidates);
        assert_eq!(outcome.device().map(|d| d.id), Some(1));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let fleet = fleet_device("SERIAL1", Platform::Darwin, "User@Example.COM");
        let candidates = vec![compliance_device(1, "serial1", "Darwin", "user@example.com")];

        assert_eq!(
            match_device(&fleet, &candidates),
            MatchOutcome::Unique(&candidates[0])
        );
    }

    #[test]
    fn unknown_compliance_platform_counts_as_linux() {
        let fleet = fleet_device("serial1", Platform::Linux, "user@example.com");
        let candidates = vec![compliance_device(1, "serial1", "arch", "user@example.com")];

        assert!(match_device(&fleet, &candidates).device().is_some());
    }

    #[test]
    fn platform_mismatch_does_not_match() {
        let fleet = fleet_device("serial1", Platform::Windows, "user@example.com");
        let candidates = vec![compliance_device(1, "serial1", "debian", "user@example.com")];

        assert_eq!(match_device(&fleet, &candidates), MatchOutcome::NoMatch);
    }

    #[test]
    fn multiple_candidates_are_ambiguous() {
        let fleet = fleet_device("serial1", Platform::Linux, "user@example.com");
        let candidates = vec![
            compliance_device(1, "serial1", "ubuntu", "user@example.com"),
            compliance_device(2, "serial1", "fedora", "user@example.com"),
        ];

        assert_eq!(match_device(&fleet, &candidates), MatchOutcome::Ambiguous(2));
    }

    #[test]
    fn empty_snapshot_is_no_match() {
        let fleet = fleet_device("serial1", Platform::Linux, "user@example.com");
        assert_eq!(match_device(&fleet, &[]), MatchOutcome::NoMatch);
    }
}
