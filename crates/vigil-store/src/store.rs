//! Storage traits
//!
//! Three durable collections back the engine: screening results
//! (append-only), conversation turns (append-only), and escalations
//! (mutable, through the state machine only). The traits are async so
//! implementations may sit on real durable storage; the in-process
//! implementations live in [`crate::memory`].

use crate::escalation::{Escalation, EscalationStatus, NoteAuthor};
use async_trait::async_trait;
use vigil_core::{ConversationTurn, EscalationId, MessageRisk, Result, SubjectId, TurnId};
use vigil_screening::ScreeningResult;

/// Query filter for escalation listings
#[derive(Debug, Clone, Default)]
pub struct EscalationFilter {
    /// Restrict to a single lifecycle state
    pub status: Option<EscalationStatus>,
}

impl EscalationFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a lifecycle state
    pub fn status(mut self, status: EscalationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether an escalation matches this filter
    pub fn matches(&self, escalation: &Escalation) -> bool {
        self.status.map_or(true, |s| escalation.status == s)
    }
}

/// Owner of escalation records and their lifecycle.
///
/// Mutations must be applied atomically against the stored record: two
/// concurrent actors must never both believe they were first to claim, and
/// no writer may overwrite a terminal status set by another.
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Create a new pending escalation.
    ///
    /// `risk` must be `High` or `Emergency`; anything else fails with
    /// `InvalidRiskLevel` rather than being coerced.
    async fn create(
        &self,
        subject: SubjectId,
        risk: MessageRisk,
        reason: String,
        triggering_turn: Option<TurnId>,
    ) -> Result<Escalation>;

    /// Fetch a single escalation, `NotFound` if absent
    async fn find(&self, id: EscalationId) -> Result<Escalation>;

    /// Append a note; a responder-authored note claims an unassigned
    /// escalation. `NotFound` if absent, `IllegalState` if terminal.
    async fn add_note(
        &self,
        id: EscalationId,
        author: NoteAuthor,
        content: String,
    ) -> Result<Escalation>;

    /// Apply a lifecycle transition. `NotFound` if absent,
    /// `IllegalTransition` for anything outside the legal table.
    async fn set_status(&self, id: EscalationId, status: EscalationStatus) -> Result<Escalation>;

    /// Snapshot listing, newest-first, optionally filtered
    async fn list(&self, filter: EscalationFilter) -> Result<Vec<Escalation>>;

    /// Any open (non-terminal) emergency escalation for the subject.
    /// Used to avoid duplicate escalations for the same unresolved crisis.
    async fn open_emergency_for(&self, subject: &SubjectId) -> Result<Option<Escalation>>;
}

/// Append-only record of scored screenings
#[async_trait]
pub trait ScreeningResultStore: Send + Sync {
    /// Persist a scored result
    async fn record(&self, result: ScreeningResult) -> Result<()>;

    /// A subject's results, newest first
    async fn history(&self, subject: &SubjectId) -> Result<Vec<ScreeningResult>>;
}

/// Append-only conversation log
#[async_trait]
pub trait ConversationLog: Send + Sync {
    /// Persist a turn
    async fn append(&self, turn: ConversationTurn) -> Result<()>;

    /// The subject's most recent turns, newest first (storage order —
    /// callers needing chronology re-sort)
    async fn recent(&self, subject: &SubjectId, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// The subject's full conversation in chronological order
    async fn history(&self, subject: &SubjectId) -> Result<Vec<ConversationTurn>>;
}
