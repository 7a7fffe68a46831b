//! In-process store implementations
//!
//! Each store serializes writers through a `parking_lot` lock, so the claim
//! and every state-machine check run atomically against the current record.
//! Reads clone a snapshot and never block writers for long.

use crate::escalation::{Escalation, EscalationNote, EscalationStatus, NoteAuthor};
use crate::store::{ConversationLog, EscalationFilter, EscalationStore, ScreeningResultStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};
use vigil_core::{
    ConversationTurn, Error, EscalationId, EscalationRisk, MessageRisk, Result, SubjectId, TurnId,
};
use vigil_screening::ScreeningResult;

/// Escalation store backed by a locked map.
///
/// The write lock is the single-writer serialization point the state machine
/// requires; every mutation re-validates against the record as currently
/// stored, never against a caller's stale copy.
#[derive(Default)]
pub struct MemoryEscalationStore {
    records: RwLock<HashMap<EscalationId, Escalation>>,
}

impl MemoryEscalationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record verbatim. Journal replay only — bypasses creation
    /// validation because the journal already holds validated history.
    pub(crate) fn load(&self, escalation: Escalation) {
        self.records.write().insert(escalation.id, escalation);
    }

    /// Mutate a record in place under the write lock. Replay only.
    pub(crate) fn load_mutation(
        &self,
        id: EscalationId,
        apply: impl FnOnce(&mut Escalation),
    ) {
        if let Some(record) = self.records.write().get_mut(&id) {
            apply(record);
        }
    }
}

#[async_trait]
impl EscalationStore for MemoryEscalationStore {
    async fn create(
        &self,
        subject: SubjectId,
        risk: MessageRisk,
        reason: String,
        triggering_turn: Option<TurnId>,
    ) -> Result<Escalation> {
        let risk = EscalationRisk::try_from(risk)?;
        let escalation = Escalation::new(subject, risk, reason, triggering_turn);

        info!(
            id = %escalation.id,
            subject = %escalation.subject,
            risk = %escalation.risk,
            "escalation created"
        );

        self.records
            .write()
            .insert(escalation.id, escalation.clone());
        Ok(escalation)
    }

    async fn find(&self, id: EscalationId) -> Result<Escalation> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("escalation {id}")))
    }

    async fn add_note(
        &self,
        id: EscalationId,
        author: NoteAuthor,
        content: String,
    ) -> Result<Escalation> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("escalation {id}")))?;

        record.apply_note(EscalationNote::new(author, content))?;
        debug!(id = %id, assignee = ?record.assigned_to, "note appended");
        Ok(record.clone())
    }

    async fn set_status(&self, id: EscalationId, status: EscalationStatus) -> Result<Escalation> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("escalation {id}")))?;

        record.apply_transition(status)?;
        info!(id = %id, status = %status, "escalation transitioned");
        Ok(record.clone())
    }

    async fn list(&self, filter: EscalationFilter) -> Result<Vec<Escalation>> {
        let records = self.records.read();
        let mut matching: Vec<Escalation> = records
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        // Most recently created first.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn open_emergency_for(&self, subject: &SubjectId) -> Result<Option<Escalation>> {
        let records = self.records.read();
        Ok(records
            .values()
            .find(|e| {
                e.subject == *subject
                    && e.risk == EscalationRisk::Emergency
                    && !e.is_terminal()
            })
            .cloned())
    }
}

/// Screening result store backed by a locked per-subject map
#[derive(Default)]
pub struct MemoryScreeningStore {
    results: RwLock<HashMap<SubjectId, Vec<ScreeningResult>>>,
}

impl MemoryScreeningStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous insert shared by `record` and journal replay
    pub(crate) fn push(&self, result: ScreeningResult) {
        self.results
            .write()
            .entry(result.subject.clone())
            .or_default()
            .push(result);
    }
}

#[async_trait]
impl ScreeningResultStore for MemoryScreeningStore {
    async fn record(&self, result: ScreeningResult) -> Result<()> {
        self.push(result);
        Ok(())
    }

    async fn history(&self, subject: &SubjectId) -> Result<Vec<ScreeningResult>> {
        let results = self.results.read();
        let mut history = results.get(subject).cloned().unwrap_or_default();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }
}

/// Conversation log backed by a locked per-subject map
#[derive(Default)]
pub struct MemoryConversationLog {
    turns: RwLock<HashMap<SubjectId, Vec<ConversationTurn>>>,
}

impl MemoryConversationLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous insert shared by `append` and journal replay
    pub(crate) fn push(&self, turn: ConversationTurn) {
        self.turns
            .write()
            .entry(turn.subject.clone())
            .or_default()
            .push(turn);
    }
}

#[async_trait]
impl ConversationLog for MemoryConversationLog {
    async fn append(&self, turn: ConversationTurn) -> Result<()> {
        self.push(turn);
        Ok(())
    }

    async fn recent(&self, subject: &SubjectId, limit: usize) -> Result<Vec<ConversationTurn>> {
        let turns = self.turns.read();
        let mut recent = turns.get(subject).cloned().unwrap_or_default();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn history(&self, subject: &SubjectId) -> Result<Vec<ConversationTurn>> {
        let turns = self.turns.read();
        let mut history = turns.get(subject).cloned().unwrap_or_default();
        history.sort_by_key(|t| t.timestamp);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use vigil_core::{ResponderId, Sender};

    fn subject() -> SubjectId {
        SubjectId::new("stu-1")
    }

    #[tokio::test]
    async fn test_create_rejects_low_risk() {
        let store = MemoryEscalationStore::new();
        let err = store
            .create(subject(), MessageRisk::Medium, "nope".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRiskLevel(_)));
    }

    #[tokio::test]
    async fn test_create_starts_pending_unassigned() {
        let store = MemoryEscalationStore::new();
        let esc = store
            .create(subject(), MessageRisk::Emergency, "crisis".into(), None)
            .await
            .unwrap();

        assert_eq!(esc.status, EscalationStatus::Pending);
        assert!(esc.assigned_to.is_none());
        assert!(esc.notes.is_empty());
        assert!(esc.resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_note_then_resolve_by_other_responder() {
        let store = MemoryEscalationStore::new();
        let esc = store
            .create(subject(), MessageRisk::High, "screening".into(), None)
            .await
            .unwrap();

        // Responder A's note claims the escalation.
        let esc = store
            .add_note(
                esc.id,
                NoteAuthor::Responder(ResponderId::new("a")),
                "on it".into(),
            )
            .await
            .unwrap();
        assert_eq!(esc.assigned_to, Some(ResponderId::new("a")));

        // Responder B may still resolve it.
        let esc = store
            .set_status(esc.id, EscalationStatus::Resolved)
            .await
            .unwrap();
        assert!(esc.resolved_at.is_some());

        // Nobody can reopen or re-terminate it.
        let err = store
            .set_status(esc.id, EscalationStatus::FalsePositive)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalTransition(_)));
    }

    #[tokio::test]
    async fn test_missing_escalation_is_not_found() {
        let store = MemoryEscalationStore::new();
        let id = EscalationId::generate();

        assert!(matches!(store.find(id).await, Err(Error::NotFound(_))));
        assert!(matches!(
            store
                .add_note(id, NoteAuthor::System, "ghost".into())
                .await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.set_status(id, EscalationStatus::Resolved).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let store = MemoryEscalationStore::new();
        let first = store
            .create(subject(), MessageRisk::High, "one".into(), None)
            .await
            .unwrap();
        let second = store
            .create(SubjectId::new("stu-2"), MessageRisk::Emergency, "two".into(), None)
            .await
            .unwrap();

        store
            .set_status(first.id, EscalationStatus::Resolved)
            .await
            .unwrap();

        let all = store.list(EscalationFilter::new()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at >= all[1].created_at);

        let pending = store
            .list(EscalationFilter::new().status(EscalationStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn test_open_emergency_lookup_ignores_terminal_and_high() {
        let store = MemoryEscalationStore::new();

        let high = store
            .create(subject(), MessageRisk::High, "screening".into(), None)
            .await
            .unwrap();
        assert!(store.open_emergency_for(&subject()).await.unwrap().is_none());

        let emergency = store
            .create(subject(), MessageRisk::Emergency, "crisis".into(), None)
            .await
            .unwrap();
        let open = store.open_emergency_for(&subject()).await.unwrap().unwrap();
        assert_eq!(open.id, emergency.id);

        store
            .set_status(emergency.id, EscalationStatus::Resolved)
            .await
            .unwrap();
        assert!(store.open_emergency_for(&subject()).await.unwrap().is_none());

        // The open high-risk escalation never satisfies the emergency query.
        let _ = high;
    }

    #[tokio::test]
    async fn test_concurrent_first_claim_is_exclusive() {
        let store = Arc::new(MemoryEscalationStore::new());
        let esc = store
            .create(subject(), MessageRisk::Emergency, "race".into(), None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for responder in ["a", "b", "c", "d"] {
            let store = Arc::clone(&store);
            let id = esc.id;
            handles.push(tokio::spawn(async move {
                store
                    .add_note(
                        id,
                        NoteAuthor::Responder(ResponderId::new(responder)),
                        format!("{responder} responding"),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let after = store.find(esc.id).await.unwrap();
        let winner = after.assigned_to.clone().unwrap();

        // The assignee is the author of the first note that landed, and all
        // four notes made it into the trail.
        assert_eq!(after.notes.len(), 4);
        match &after.notes[0].author {
            NoteAuthor::Responder(first) => assert_eq!(*first, winner),
            NoteAuthor::System => panic!("expected responder note"),
        }
    }

    #[tokio::test]
    async fn test_conversation_log_recent_and_history() {
        let log = MemoryConversationLog::new();
        let base = chrono::Utc::now();

        for (offset, text) in [(0, "first"), (10, "second"), (20, "third")] {
            log.append(ConversationTurn {
                id: TurnId::generate(),
                subject: subject(),
                text: text.to_string(),
                sender: Sender::Subject,
                timestamp: base + ChronoDuration::seconds(offset),
                classification: None,
            })
            .await
            .unwrap();
        }

        let recent = log.recent(&subject(), 2).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second"]);

        let history = log.history(&subject()).await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_screening_history_newest_first() {
        use vigil_screening::{score, Answer, Instrument, ScreeningSubmission};

        let store = MemoryScreeningStore::new();
        for values in [[0u8; 7], [1; 7]] {
            let result = score(ScreeningSubmission {
                instrument: Instrument::Gad7,
                subject: subject(),
                answers: values
                    .iter()
                    .enumerate()
                    .map(|(question, &value)| Answer { question, value })
                    .collect(),
            })
            .unwrap();
            store.record(result).await.unwrap();
        }

        let history = store.history(&subject()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at >= history[1].created_at);
    }
}
