//! Declarative severity policy: problem kind and context in, severity out.
//!
//! One table serves triage, alerting, and reporting so the three never
//! disagree about how bad a kind is.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::Warning => "WARNING",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "WARNING" => Ok(Severity::Warning),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Kinds that are critical no matter what context they arrive with.
const CRITICAL_KINDS: &[&str] = &[
    "BACKEND_DOWN",
    "DATABASE_CRITICAL",
    "API_CRITICAL",
    "SECURITY_CRITICAL",
];

/// Resource-pressure kinds. Noisy, so they stay at WARNING.
const WARNING_KINDS: &[&str] = &["HIGH_CPU", "HIGH_MEMORY", "LOW_DISK"];

/// Components whose faults default to HIGH.
const HIGH_COMPONENTS: &[&str] = &["backend", "frontend", "database"];

const COMPONENT_MAP: &[(&str, &str)] = &[
    ("BACKEND_DOWN", "backend"),
    ("BACKEND_UNHEALTHY", "backend"),
    ("FRONTEND_DOWN", "frontend"),
    ("FRONTEND_UNHEALTHY", "frontend"),
    ("DATABASE_CRITICAL", "database"),
    ("API_CRITICAL", "external_api"),
    ("SECURITY_CRITICAL", "security"),
    ("HIGH_CPU", "system"),
    ("HIGH_MEMORY", "system"),
    ("LOW_DISK", "system"),
];

/// Policy order: kind lists first, then the trading escalation, then the
/// component default.
pub fn assess_severity(kind: &str, component: &str, affects_trading: bool) -> Severity {
    if CRITICAL_KINDS.contains(&kind) {
        Severity::Critical
    } else if WARNING_KINDS.contains(&kind) {
        Severity::Warning
    } else if affects_trading {
        Severity::Critical
    } else if HIGH_COMPONENTS.contains(&component) {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Component a problem kind belongs to, for fingerprint context.
pub fn component_for_kind(kind: &str) -> &'static str {
    COMPONENT_MAP
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or("unknown", |(_, c)| c)
}

/// Whether a kind endangers the trading path.
pub fn affects_trading(kind: &str) -> bool {
    CRITICAL_KINDS.contains(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_kinds_always_critical() {
        assert_eq!(
            assess_severity("BACKEND_DOWN", "unknown", false),
            Severity::Critical
        );
        assert_eq!(
            assess_severity("SECURITY_CRITICAL", "system", false),
            Severity::Critical
        );
    }

    #[test]
    fn test_resource_kinds_stay_warning_even_when_trading_affected() {
        // Kind lists take precedence over the escalation flag.
        assert_eq!(
            assess_severity("HIGH_MEMORY", "system", true),
            Severity::Warning
        );
    }

    #[test]
    fn test_trading_escalation() {
        assert_eq!(
            assess_severity("ODD_FAILURE", "system", true),
            Severity::Critical
        );
    }

    #[test]
    fn test_component_default() {
        assert_eq!(
            assess_severity("ODD_FAILURE", "backend", false),
            Severity::High
        );
        assert_eq!(
            assess_severity("ODD_FAILURE", "cron", false),
            Severity::Medium
        );
    }

    #[test]
    fn test_component_for_kind() {
        assert_eq!(component_for_kind("API_CRITICAL"), "external_api");
        assert_eq!(component_for_kind("BACKEND_UNHEALTHY"), "backend");
        assert_eq!(component_for_kind("SOMETHING_ELSE"), "unknown");
    }

    #[test]
    fn test_unhealthy_service_defaults_high() {
        // Not a critical kind, but the backend component keeps it HIGH.
        assert_eq!(
            assess_severity("BACKEND_UNHEALTHY", "backend", false),
            Severity::High
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Warning);
        assert!(Severity::Warning > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_round_trip() {
        for sev in [
            Severity::Low,
            Severity::Medium,
            Severity::Warning,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(sev.as_str().parse::<Severity>().unwrap(), sev);
        }
    }
}
