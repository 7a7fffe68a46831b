//! Screening severity to escalation risk mapping
//!
//! Kept as an explicit table so the tier pairing can be audited (and tested)
//! independently of the control flow that consumes it.

use vigil_core::{EscalationRisk, ScreeningSeverity};

/// Severity tiers that warrant an automatic escalation, and at which risk
static ESCALATION_TABLE: &[(ScreeningSeverity, EscalationRisk)] = &[
    (ScreeningSeverity::ModeratelySevere, EscalationRisk::High),
    (ScreeningSeverity::Severe, EscalationRisk::Emergency),
];

/// Escalation risk for a screening severity, `None` for tiers that do not
/// escalate
pub fn severity_escalation(severity: ScreeningSeverity) -> Option<EscalationRisk> {
    ESCALATION_TABLE
        .iter()
        .find(|(s, _)| *s == severity)
        .map(|(_, risk)| *risk)
}
