//! Risk vocabularies
//!
//! Two ordered risk scales flow through the engine: screening severity
//! (derived from questionnaire scores) and message risk (produced by the
//! chat-risk model). Escalations carry their own restricted tier set.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tier derived from a screening instrument score.
///
/// Ordered: `None < Mild < Moderate < ModeratelySevere < Severe`. The GAD-7
/// instrument has no moderately-severe tier; its threshold table simply never
/// produces that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreeningSeverity {
    None,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

impl fmt::Display for ScreeningSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::ModeratelySevere => "moderately-severe",
            Self::Severe => "severe",
        };
        f.write_str(s)
    }
}

/// Risk tier attached to a conversational message.
///
/// Ordered: `NoRisk < Low < Medium < High < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageRisk {
    NoRisk,
    Low,
    Medium,
    High,
    Emergency,
}

impl fmt::Display for MessageRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoRisk => "no-risk",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// Risk tier an escalation may carry. Only the two top message tiers qualify;
/// everything below is rejected at the store boundary, not coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationRisk {
    High,
    Emergency,
}

impl fmt::Display for EscalationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Emergency => f.write_str("emergency"),
        }
    }
}

impl TryFrom<MessageRisk> for EscalationRisk {
    type Error = Error;

    fn try_from(risk: MessageRisk) -> Result<Self, Self::Error> {
        match risk {
            MessageRisk::High => Ok(Self::High),
            MessageRisk::Emergency => Ok(Self::Emergency),
            other => Err(Error::invalid_risk_level(format!(
                "escalations require high or emergency risk, got {other}"
            ))),
        }
    }
}

impl From<EscalationRisk> for MessageRisk {
    fn from(risk: EscalationRisk) -> Self {
        match risk {
            EscalationRisk::High => Self::High,
            EscalationRisk::Emergency => Self::Emergency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ScreeningSeverity::None < ScreeningSeverity::Mild);
        assert!(ScreeningSeverity::Moderate < ScreeningSeverity::ModeratelySevere);
        assert!(ScreeningSeverity::ModeratelySevere < ScreeningSeverity::Severe);
    }

    #[test]
    fn test_message_risk_ordering() {
        assert!(MessageRisk::NoRisk < MessageRisk::Low);
        assert!(MessageRisk::High < MessageRisk::Emergency);
    }

    #[test]
    fn test_escalation_risk_conversion() {
        assert_eq!(
            EscalationRisk::try_from(MessageRisk::Emergency).unwrap(),
            EscalationRisk::Emergency
        );
        assert_eq!(
            EscalationRisk::try_from(MessageRisk::High).unwrap(),
            EscalationRisk::High
        );
        assert!(matches!(
            EscalationRisk::try_from(MessageRisk::Medium),
            Err(Error::InvalidRiskLevel(_))
        ));
    }

    #[test]
    fn test_kebab_case_serialization() {
        let json = serde_json::to_string(&ScreeningSeverity::ModeratelySevere).unwrap();
        assert_eq!(json, r#""moderately-severe""#);

        let risk: MessageRisk = serde_json::from_str(r#""no-risk""#).unwrap();
        assert_eq!(risk, MessageRisk::NoRisk);
    }
}
