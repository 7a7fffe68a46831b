//! Escalation records and their state machine
//!
//! An escalation is a tracked incident requiring human review. It moves
//! through `pending -> in-progress -> {resolved, false-positive}` (terminal
//! states may also be entered directly from pending), carries an append-only
//! note trail, and is claimed by the first responder who acts on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_core::{Error, EscalationId, EscalationRisk, ResponderId, Result, SubjectId, TurnId};

/// Lifecycle state of an escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscalationStatus {
    /// Newly created, awaiting a responder
    Pending,
    /// A responder is working the incident
    InProgress,
    /// Reviewed and handled (terminal)
    Resolved,
    /// Reviewed and judged not a real incident (terminal)
    FalsePositive,
}

impl EscalationStatus {
    /// Whether this state ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::FalsePositive)
    }

    /// The legal transition table. Everything not listed here — including
    /// same-state repeats and any move out of a terminal state — is illegal.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Resolved)
                | (Self::Pending, Self::FalsePositive)
                | (Self::InProgress, Self::Resolved)
                | (Self::InProgress, Self::FalsePositive)
        )
    }
}

impl fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
            Self::FalsePositive => "false-positive",
        };
        f.write_str(s)
    }
}

/// Who authored an escalation note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteAuthor {
    /// Automatic note written by the engine itself
    System,
    /// A human responder; authoring a note claims an unassigned escalation
    Responder(ResponderId),
}

/// One entry in an escalation's append-only note trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationNote {
    /// Note author
    pub author: NoteAuthor,

    /// Note text
    pub content: String,

    /// When the note was added
    pub timestamp: DateTime<Utc>,
}

impl EscalationNote {
    /// Create a note stamped now
    pub fn new(author: NoteAuthor, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A tracked incident requiring human review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    /// Unique identifier
    pub id: EscalationId,

    /// Subject the incident concerns
    pub subject: SubjectId,

    /// Conversation turn that triggered the incident, when chat-detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggering_turn: Option<TurnId>,

    /// Incident risk tier
    pub risk: EscalationRisk,

    /// Free-text reason the incident was raised
    pub reason: String,

    /// Current lifecycle state
    pub status: EscalationStatus,

    /// Responder who claimed the incident, once someone has
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<ResponderId>,

    /// Append-only note trail
    pub notes: Vec<EscalationNote>,

    /// When the incident was raised
    pub created_at: DateTime<Utc>,

    /// Set exactly once, on entering a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Bumped on every mutation; detects conflicting concurrent writes
    pub version: u64,
}

impl Escalation {
    /// Create a fresh pending escalation: no assignee, empty note trail
    pub fn new(
        subject: SubjectId,
        risk: EscalationRisk,
        reason: impl Into<String>,
        triggering_turn: Option<TurnId>,
    ) -> Self {
        Self {
            id: EscalationId::generate(),
            subject,
            triggering_turn,
            risk,
            reason: reason.into(),
            status: EscalationStatus::Pending,
            assigned_to: None,
            notes: Vec::new(),
            created_at: Utc::now(),
            resolved_at: None,
            version: 0,
        }
    }

    /// Whether the lifecycle has ended
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a note. Fails with `IllegalState` on a terminal escalation.
    ///
    /// A responder-authored note on an unassigned escalation claims it;
    /// later claim attempts are no-ops, never overwrites.
    pub(crate) fn apply_note(&mut self, note: EscalationNote) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::illegal_state(format!(
                "escalation {} is {}, notes are closed",
                self.id, self.status
            )));
        }

        if self.assigned_to.is_none() {
            if let NoteAuthor::Responder(ref responder) = note.author {
                self.assigned_to = Some(responder.clone());
            }
        }

        self.notes.push(note);
        self.version += 1;
        Ok(())
    }

    /// Move to `next`. Fails with `IllegalTransition` for anything outside
    /// the legal table, leaving the record unchanged. Entering a terminal
    /// state stamps `resolved_at`; the stamp is immutable thereafter.
    pub(crate) fn apply_transition(&mut self, next: EscalationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::illegal_transition(format!(
                "escalation {}: {} -> {}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        if next.is_terminal() {
            self.resolved_at = Some(Utc::now());
        }
        self.version += 1;
        Ok(())
    }
}
