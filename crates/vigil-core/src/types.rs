//! Core types for Vigil
//!
//! Identifiers, conversation turns, and classification results shared across
//! the triage components.

use crate::risk::MessageRisk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to the person being supported.
///
/// Issued by the user directory, which is outside this subsystem; the engine
/// never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject reference
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying directory identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque reference to a human responder (counselor or admin)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponderId(String);

impl ResponderId {
    /// Create a responder reference
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying directory identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResponderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResponderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(uuid::Uuid);

impl TurnId {
    /// Generate a fresh turn identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn_{}", self.0)
    }
}

/// Unique identifier for an escalation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationId(uuid::Uuid);

impl EscalationId {
    /// Generate a fresh escalation identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for EscalationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esc_{}", self.0)
    }
}

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person being supported
    Subject,
    /// The supportive assistant replying to them
    Assistant,
}

/// Result of analyzing a single message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Risk tier assigned to the message
    pub risk: MessageRisk,

    /// Detected intent label (e.g. "academic_stress", "crisis")
    pub intent: String,

    /// Model confidence in [0, 1]
    pub confidence: f32,

    /// Whether the model flagged an acute crisis
    pub emergency: bool,

    /// Supportive reply to surface back to the subject
    pub reply: String,

    /// Set when this is a fallback produced without the external model.
    /// Degraded results are never conflated with genuine benign ones.
    pub degraded: bool,
}

impl Classification {
    /// Create a genuine (non-degraded) classification
    pub fn new(
        risk: MessageRisk,
        intent: impl Into<String>,
        confidence: f32,
        emergency: bool,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            risk,
            intent: intent.into(),
            confidence: confidence.clamp(0.0, 1.0),
            emergency,
            reply: reply.into(),
            degraded: false,
        }
    }

    /// True when this message warrants an emergency escalation
    pub fn is_emergency(&self) -> bool {
        self.emergency || self.risk == MessageRisk::Emergency
    }
}

/// A single message in a subject's conversation.
///
/// Turns are append-only; ordering is by timestamp ascending. Only
/// subject-authored turns carry a classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn identifier
    pub id: TurnId,

    /// Subject this conversation belongs to
    pub subject: SubjectId,

    /// Message text
    pub text: String,

    /// Who authored the turn
    pub sender: Sender,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,

    /// Attached classification (subject turns only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl ConversationTurn {
    /// Create a classified subject-authored turn
    pub fn from_subject(
        subject: SubjectId,
        text: impl Into<String>,
        classification: Classification,
    ) -> Self {
        Self {
            id: TurnId::generate(),
            subject,
            text: text.into(),
            sender: Sender::Subject,
            timestamp: Utc::now(),
            classification: Some(classification),
        }
    }

    /// Create an assistant reply turn
    pub fn from_assistant(subject: SubjectId, text: impl Into<String>) -> Self {
        Self {
            id: TurnId::generate(),
            subject,
            text: text.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            classification: None,
        }
    }
}
