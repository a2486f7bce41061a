//! Per-check criticality policy.
//!
//! Each compliance check is assigned a criticality: either a grace
//! duration (how old an unresolved failure may get before the device is
//! marked unhealthy) or [`Criticality::Ignore`] (the check never fails a
//! device). Unknown check ids fall back to a configured default, which
//! is never `Ignore`.

use std::collections::HashMap;

use chrono::Duration;

/// Criticality of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Never fail the device for this check, regardless of age
    Ignore,
    /// Maximum allowed age of an unresolved failure. A zero duration
    /// means "fail on any unresolved occurrence", not a zero-length
    /// window.
    Grace(Duration),
}

impl Criticality {
    /// Fail immediately on first observation.
    pub fn critical() -> Self {
        Criticality::Grace(Duration::zero())
    }

    /// One hour of grace.
    pub fn danger() -> Self {
        Criticality::Grace(Duration::hours(1))
    }

    /// Two days of grace.
    pub fn warning() -> Self {
        Criticality::Grace(Duration::days(2))
    }

    /// Seven days of grace.
    pub fn notice() -> Self {
        Criticality::Grace(Duration::days(7))
    }

    /// Map a severity tag to its level. Tags are matched
    /// case-insensitively; unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "info" => Some(Criticality::Ignore),
            "notice" => Some(Criticality::notice()),
            "warning" => Some(Criticality::warning()),
            "danger" => Some(Criticality::danger()),
            "critical" => Some(Criticality::critical()),
            _ => None,
        }
    }

    /// Whether a check tag is one of the recognized severity tags.
    pub fn is_severity_tag(tag: &str) -> bool {
        Self::from_tag(tag).is_some()
    }

    /// Resolve a check's tag list to a criticality.
    ///
    /// The most permissive recognized tag wins (an `info` tag silences
    /// the check even when a `critical` tag is also present); with no
    /// recognized tags the result is the warning level.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        tags.iter()
            .filter_map(|tag| Self::from_tag(tag.as_ref()))
            .chain(std::iter::once(Criticality::warning()))
            .min_by_key(|criticality| criticality.rank())
            .unwrap_or_else(Criticality::warning)
    }

    // Ordering key: Ignore below every grace duration.
    fn rank(&self) -> i64 {
        match self {
            Criticality::Ignore => -1,
            Criticality::Grace(grace) => grace.num_seconds(),
        }
    }
}

/// Immutable mapping from check id to criticality, with a default for
/// checks the mapping does not know about.
///
/// Built once at startup and handed to the evaluator; there is no
/// global state and no reloading mid-run.
#[derive(Debug, Clone)]
pub struct CriticalityPolicy {
    checks: HashMap<i64, Criticality>,
    default: Criticality,
}

impl CriticalityPolicy {
    /// Policy with an explicit mapping and default.
    pub fn new(checks: HashMap<i64, Criticality>, default: Criticality) -> Self {
        CriticalityPolicy { checks, default }
    }

    /// Empty mapping; every lookup returns `default`.
    pub fn with_default(default: Criticality) -> Self {
        CriticalityPolicy {
            checks: HashMap::new(),
            default,
        }
    }

    /// Add or override a single check's criticality.
    pub fn with_check(mut self, check_id: i64, criticality: Criticality) -> Self {
        self.checks.insert(check_id, criticality);
        self
    }

    /// Grace time for a check. Total over all ids: unmapped ids get the
    /// configured default.
    pub fn grace_time(&self, check_id: i64) -> Criticality {
        self.checks
            .get(&check_id)
            .copied()
            .unwrap_or(self.default)
    }

    /// Check ids the policy ignores outright.
    pub fn ignored_checks(&self) -> impl Iterator<Item = i64> + '_ {
        self.checks
            .iter()
            .filter(|(_, criticality)| **criticality == Criticality::Ignore)
            .map(|(id, _)| *id)
    }
}

impl Default for CriticalityPolicy {
    /// The built-in checks table from the production deployment.
    ///
    /// New checks the compliance service introduces that are missing
    /// here fall back to the warning level; run `validate-checks` to
    /// find them.
    fn default() -> Self {
        let crit = Criticality::critical();
        let danger = Criticality::danger();
        let warning = Criticality::warning();
        let notice = Criticality::notice();

        let checks = HashMap::from([
            (1, crit),                    // macOS - Bluetooth Sharing Enabled
            (2, crit),                    // macOS - Disc Sharing Enabled
            (3, danger),                  // Unencrypted SSH Keys
            (4, crit),                    // Evil Chrome Extension - TouchVPN
            (5, crit),                    // Evil Chrome Extension - StartNewSearch
            (6, crit),                    // Evil Chrome Extension - Searchmanager
            (7, danger),                  // macOS - Find My Mac Disabled
            (8, notice),                  // macOS - Finder File Extensions Hidden
            (9, warning),                 // Windows - Explorer Show All File Extensions Disabled
            (10, crit),                   // macOS - File Sharing Enabled
            (11, danger),                 // macOS - Firewall Disabled
            (12, crit),                   // Windows - Firewall Disabled
            (13, crit),                   // macOS - Gatekeeper Disabled
            (14, crit),                   // macOS - Internet Sharing Enabled
            (15, crit),                   // Malware - Adware Doctor (Files)
            (16, crit),                   // Malware - Adware Doctor (App)
            (17, crit),                   // Malware - Dr. Unarchiver
            (18, crit),                   // Malware - Dr. Antivirus
            (19, crit),                   // Malware - Dr. No Sleep
            (20, crit),                   // Malware - Dr. Cleaner
            (21, crit),                   // Malware - WireLurker
            (22, crit),                   // Malware - OSX/Leverage.A (launchd)
            (23, crit),                   // Malware - OSX/Leverage.A (Files)
            (24, crit),                   // Malware - Tibet.D
            (25, crit),                   // Malware - DevilRobber
            (26, crit),                   // Sudo Does Not Require Password
            (27, warning),                // macOS - GitHub 2FA Codes stored in Plain-Text
            (28, warning),                // macOS - GSuite 2FA Codes stored in Plain-Text
            (29, warning),                // macOS - 1Password Emergency Kits stored in Plain-Text
            (30, crit),                   // macOS - Printer Sharing Enabled
            (31, crit),                   // macOS - FileVault2 Disk Encryption Not Enabled
            (32, crit),                   // Linux - Primary Disk Encryption Not Enabled
            (33, crit),                   // Windows - Bitlocker Disk Encryption Not Enabled
            (34, crit),                   // macOS - Remote Apple Events Enabled
            (35, crit),                   // macOS - Remote Login (SSH) Enabled
            (36, crit),                   // macOS - Remote Management Enabled
            (37, warning),                // macOS - Terminal.app Secure Keyboard Entry Disabled
            (38, warning),                // macOS - iTerm2.app Secure Keyboard Entry Disabled
            (39, crit),                   // macOS - System Integrity Protection (SIP) Disabled
            (40, crit),                   // Windows - User Account Control (UAC) Disabled
            (41, crit),                   // Vulnerability - Insecure Zoom Video Conference Server
            (15804, Criticality::Ignore), // MacBook - Battery Unhealthy
            (15805, Criticality::Ignore), // macOS - Primary Disk Almost Full
            (15806, Criticality::Ignore), // Linux - Primary Disk Almost Full
            (15807, Criticality::Ignore), // Windows - Primary Disk Almost Full
            (27680, crit),                // macOS - Operating System Important Updates Missing
            (29818, crit),                // Vulnerability - iTerm2 (CVE-2019-9535)
            (47076, warning),             // Windows - Ransomware Protection Disabled
            (49356, crit),                // Windows - Screen Lock Disabled
            (50322, crit),                // Windows - No Antivirus Products Configured
            (53542, crit),                // Vulnerability - Windows CryptoAPI (CVE-2020-0601)
        ]);

        CriticalityPolicy::new(checks, warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_check_gets_default_not_ignore() {
        let policy = CriticalityPolicy::default();
        assert_eq!(policy.grace_time(999_999), Criticality::warning());
    }

    #[test]
    fn known_checks_resolve() {
        let policy = CriticalityPolicy::default();
        assert_eq!(policy.grace_time(12), Criticality::critical());
        assert_eq!(policy.grace_time(15804), Criticality::Ignore);
    }

    #[test]
    fn malware_checks_fail_immediately() {
        let policy = CriticalityPolicy::default();
        for check_id in 15..=25 {
            assert_eq!(
                policy.grace_time(check_id),
                Criticality::critical(),
                "check {check_id} should have zero grace"
            );
        }
    }

    #[test]
    fn with_check_overrides() {
        let policy = CriticalityPolicy::with_default(Criticality::warning())
            .with_check(7, Criticality::Ignore);
        assert_eq!(policy.grace_time(7), Criticality::Ignore);
    }

    #[test]
    fn ignored_checks_lists_only_ignores() {
        let policy = CriticalityPolicy::with_default(Criticality::warning())
            .with_check(1, Criticality::Ignore)
            .with_check(2, Criticality::critical());
        let mut ignored: Vec<i64> = policy.ignored_checks().collect();
        ignored.sort_unstable();
        assert_eq!(ignored, vec![1]);
    }

    #[test]
    fn no_tags_falls_back_to_warning() {
        let tags: Vec<String> = Vec::new();
        assert_eq!(Criticality::from_tags(&tags), Criticality::warning());
    }

    #[test]
    fn strictest_recognized_tag_wins() {
        assert_eq!(
            Criticality::from_tags(&["CRITICAL", "LINUX", "WINDOWS"]),
            Criticality::critical()
        );
    }

    #[test]
    fn info_tag_silences_even_critical() {
        assert_eq!(
            Criticality::from_tags(&["CRITICAL", "LINUX", "INFO"]),
            Criticality::Ignore
        );
    }

    #[test]
    fn unrecognized_tags_are_skipped() {
        assert_eq!(
            Criticality::from_tags(&["macos", "encryption"]),
            Criticality::warning()
        );
        assert!(!Criticality::is_severity_tag("macos"));
        assert!(Criticality::is_severity_tag("Danger"));
    }
}
