//! Vigil Core
//!
//! Core types shared across the Vigil triage components.
//!
//! This crate provides:
//! - The ordered risk vocabularies (screening severity, message risk,
//!   escalation risk)
//! - Opaque identifiers for subjects, responders, turns, and escalations
//! - Conversation turns and classification results
//! - Error types and result handling

pub mod error;
pub mod risk;
pub mod types;

pub use error::{Error, Result};
pub use risk::{EscalationRisk, MessageRisk, ScreeningSeverity};
pub use types::{
    Classification, ConversationTurn, EscalationId, ResponderId, Sender, SubjectId, TurnId,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::risk::{EscalationRisk, MessageRisk, ScreeningSeverity};
    pub use crate::types::{
        Classification, ConversationTurn, EscalationId, ResponderId, Sender, SubjectId, TurnId,
    };
}
