//! Triage orchestrator
//!
//! The entry point collaborators invoke: screening submissions and chat
//! messages come in, classifications and (when warranted) escalations come
//! out. The orchestrator owns the escalation decisions; scoring, analysis,
//! and storage are delegated to the components it composes.

use crate::config::EngineConfig;
use crate::mapping::severity_escalation;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vigil_classifier::{ChatRiskClassifier, RiskAnalyzer};
use vigil_core::{
    Classification, ConversationTurn, EscalationId, MessageRisk, ResponderId, Result, SubjectId,
};
use vigil_screening::{score, ScreeningResult, ScreeningSubmission};
use vigil_store::{
    restore, ConversationLog, Escalation, EscalationFilter, EscalationStatus, EscalationStore,
    Journal, JournalEvent, MemoryConversationLog, MemoryEscalationStore, MemoryScreeningStore,
    NoteAuthor, ScreeningResultStore,
};

/// Note attached automatically to screening-triggered escalations
const SCREENING_NOTE: &str = "Automatic escalation triggered by screening result.";

/// Outcome of processing a screening submission
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningOutcome {
    /// The scored result
    pub result: ScreeningResult,

    /// Escalation raised for it, when the severity warranted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

/// Outcome of processing a conversation message
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    /// The classified, persisted subject turn
    pub turn: ConversationTurn,

    /// The assistant reply turn
    pub reply: ConversationTurn,

    /// The classification attached to the subject turn
    pub classification: Classification,

    /// Escalation raised for it, when an emergency was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

/// The assembled triage engine
pub struct Triage {
    analyzer: Arc<dyn RiskAnalyzer>,
    escalations: Arc<dyn EscalationStore>,
    screenings: Arc<dyn ScreeningResultStore>,
    log: Arc<dyn ConversationLog>,
    journal: Option<Journal>,
    history_window: usize,
}

impl Triage {
    /// Assemble an engine from explicit components
    pub fn new(
        analyzer: Arc<dyn RiskAnalyzer>,
        escalations: Arc<dyn EscalationStore>,
        screenings: Arc<dyn ScreeningResultStore>,
        log: Arc<dyn ConversationLog>,
        history_window: usize,
    ) -> Self {
        Self {
            analyzer,
            escalations,
            screenings,
            log,
            journal: None,
            history_window,
        }
    }

    /// Attach a journal; every store event is recorded through it
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Assemble the default engine from configuration: HTTP classifier,
    /// in-process stores, journal replay when a path is configured.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let analyzer = Arc::new(ChatRiskClassifier::new(&config.classifier)?);

        let (escalations, screenings, log) = match &config.journal.path {
            Some(path) => restore(Journal::replay(path)?),
            None => (
                MemoryEscalationStore::new(),
                MemoryScreeningStore::new(),
                MemoryConversationLog::new(),
            ),
        };

        let mut triage = Self::new(
            analyzer,
            Arc::new(escalations),
            Arc::new(screenings),
            Arc::new(log),
            config.classifier.history_window,
        );

        if let Some(path) = &config.journal.path {
            triage.journal = Some(Journal::open(path, config.journal.flush_interval)?);
        }

        Ok(triage)
    }

    /// Record a journal event. Journal trouble is logged, not propagated —
    /// a disk hiccup must not fail the triage request itself.
    fn record(&self, event: JournalEvent) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record(&event) {
                warn!(error = %e, "failed to journal store event");
            }
        }
    }

    /// Score a screening submission, persist the result, and escalate when
    /// the severity warrants it.
    pub async fn process_screening(
        &self,
        submission: ScreeningSubmission,
    ) -> Result<ScreeningOutcome> {
        let result = score(submission)?;
        self.screenings.record(result.clone()).await?;
        self.record(JournalEvent::ScreeningRecorded {
            result: result.clone(),
        });

        let escalation = self.on_screening_result(&result).await?;
        Ok(ScreeningOutcome { result, escalation })
    }

    /// The escalation decision for an already-scored result.
    ///
    /// Severe maps to an emergency escalation, moderately-severe to a high
    /// one; lower severities never escalate.
    pub async fn on_screening_result(
        &self,
        result: &ScreeningResult,
    ) -> Result<Option<Escalation>> {
        let Some(risk) = severity_escalation(result.severity) else {
            debug!(
                subject = %result.subject,
                severity = %result.severity,
                "screening below escalation threshold"
            );
            return Ok(None);
        };

        let reason = format!(
            "Critical screening result: {} score {}",
            result.instrument, result.score
        );
        let escalation = self
            .escalations
            .create(result.subject.clone(), risk.into(), reason, None)
            .await?;
        self.record(JournalEvent::EscalationCreated {
            escalation: escalation.clone(),
        });

        let escalation = self
            .escalations
            .add_note(escalation.id, NoteAuthor::System, SCREENING_NOTE.to_string())
            .await?;
        if let Some(note) = escalation.notes.last() {
            self.record(JournalEvent::NoteAdded {
                id: escalation.id,
                note: note.clone(),
            });
        }

        info!(
            id = %escalation.id,
            subject = %escalation.subject,
            severity = %result.severity,
            "screening escalation raised"
        );
        Ok(Some(escalation))
    }

    /// Analyze a new message, persist both sides of the exchange, and raise
    /// an emergency escalation when one is detected.
    pub async fn process_message(
        &self,
        subject: SubjectId,
        text: impl Into<String>,
    ) -> Result<MessageOutcome> {
        let text = text.into();
        let history = self.log.recent(&subject, self.history_window).await?;
        let classification = self.analyzer.analyze(&text, &history).await;

        if classification.degraded {
            warn!(subject = %subject, risk = %classification.risk, "degraded classification stored");
        }

        let turn = ConversationTurn::from_subject(subject.clone(), text, classification.clone());
        self.log.append(turn.clone()).await?;
        self.record(JournalEvent::TurnAppended { turn: turn.clone() });

        let reply = ConversationTurn::from_assistant(subject.clone(), classification.reply.clone());
        self.log.append(reply.clone()).await?;
        self.record(JournalEvent::TurnAppended { turn: reply.clone() });

        let escalation = if classification.is_emergency() {
            self.escalate_emergency(&subject, &turn, &classification)
                .await?
        } else {
            None
        };

        Ok(MessageOutcome {
            turn,
            reply,
            classification,
            escalation,
        })
    }

    /// Raise an emergency escalation for a chat-detected crisis, unless the
    /// subject already has one open. One open emergency per subject keeps
    /// repeated crisis messages from flooding the responder queue.
    async fn escalate_emergency(
        &self,
        subject: &SubjectId,
        turn: &ConversationTurn,
        classification: &Classification,
    ) -> Result<Option<Escalation>> {
        if let Some(open) = self.escalations.open_emergency_for(subject).await? {
            debug!(
                subject = %subject,
                open = %open.id,
                "emergency already open, skipping duplicate escalation"
            );
            return Ok(None);
        }

        let reason = format!(
            "Crisis detected in conversation: intent {} (confidence {:.2})",
            classification.intent, classification.confidence
        );
        let escalation = self
            .escalations
            .create(
                subject.clone(),
                MessageRisk::Emergency,
                reason,
                Some(turn.id),
            )
            .await?;
        self.record(JournalEvent::EscalationCreated {
            escalation: escalation.clone(),
        });

        info!(id = %escalation.id, subject = %subject, "chat emergency escalation raised");
        Ok(Some(escalation))
    }

    /// Manual escalation by a human or another system. The store validates
    /// the risk tier.
    pub async fn report_manual(
        &self,
        subject: SubjectId,
        risk: MessageRisk,
        reason: impl Into<String>,
    ) -> Result<Escalation> {
        let escalation = self
            .escalations
            .create(subject, risk, reason.into(), None)
            .await?;
        self.record(JournalEvent::EscalationCreated {
            escalation: escalation.clone(),
        });
        Ok(escalation)
    }

    /// Responder surface: append a note (first responder claims)
    pub async fn note(
        &self,
        id: EscalationId,
        responder: ResponderId,
        content: impl Into<String>,
    ) -> Result<Escalation> {
        let escalation = self
            .escalations
            .add_note(id, NoteAuthor::Responder(responder), content.into())
            .await?;
        if let Some(note) = escalation.notes.last() {
            self.record(JournalEvent::NoteAdded {
                id,
                note: note.clone(),
            });
        }
        Ok(escalation)
    }

    /// Responder surface: lifecycle transition
    pub async fn transition(
        &self,
        id: EscalationId,
        status: EscalationStatus,
    ) -> Result<Escalation> {
        let escalation = self.escalations.set_status(id, status).await?;
        self.record(JournalEvent::StatusChanged {
            id,
            status: escalation.status,
            resolved_at: escalation.resolved_at,
        });
        Ok(escalation)
    }

    /// Responder surface: queue listing, newest first
    pub async fn escalations(&self, filter: EscalationFilter) -> Result<Vec<Escalation>> {
        self.escalations.list(filter).await
    }

    /// Responder surface: single escalation
    pub async fn escalation(&self, id: EscalationId) -> Result<Escalation> {
        self.escalations.find(id).await
    }

    /// A subject's screening history, newest first
    pub async fn screening_history(&self, subject: &SubjectId) -> Result<Vec<ScreeningResult>> {
        self.screenings.history(subject).await
    }

    /// A subject's conversation, chronological
    pub async fn conversation(&self, subject: &SubjectId) -> Result<Vec<ConversationTurn>> {
        self.log.history(subject).await
    }

    /// Flush the journal, if one is attached
    pub fn flush_journal(&self) -> Result<()> {
        match &self.journal {
            Some(journal) => journal.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vigil_core::Error;
    use vigil_screening::{Answer, Instrument};

    /// Analyzer returning a canned classification and recording what it saw
    struct MockAnalyzer {
        classification: Classification,
        seen_history: Mutex<Vec<usize>>,
    }

    impl MockAnalyzer {
        fn returning(classification: Classification) -> Self {
            Self {
                classification,
                seen_history: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RiskAnalyzer for MockAnalyzer {
        async fn analyze(&self, _message: &str, history: &[ConversationTurn]) -> Classification {
            self.seen_history.lock().unwrap().push(history.len());
            self.classification.clone()
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn engine_with(analyzer: Arc<dyn RiskAnalyzer>) -> Triage {
        Triage::new(
            analyzer,
            Arc::new(MemoryEscalationStore::new()),
            Arc::new(MemoryScreeningStore::new()),
            Arc::new(MemoryConversationLog::new()),
            5,
        )
    }

    fn submission(instrument: Instrument, values: &[u8]) -> ScreeningSubmission {
        ScreeningSubmission {
            instrument,
            subject: SubjectId::new("stu-1"),
            answers: values
                .iter()
                .enumerate()
                .map(|(question, &value)| Answer { question, value })
                .collect(),
        }
    }

    fn calm() -> Classification {
        Classification::new(MessageRisk::Low, "general", 0.6, false, "I'm here to listen.")
    }

    fn crisis() -> Classification {
        Classification::new(MessageRisk::Emergency, "crisis", 0.93, true, "Please reach out now.")
    }

    #[tokio::test]
    async fn test_severe_screening_raises_emergency_escalation() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(calm())));

        let outcome = engine
            .process_screening(submission(Instrument::Phq9, &[3; 9]))
            .await
            .unwrap();

        assert_eq!(outcome.result.score, 27);
        let escalation = outcome.escalation.unwrap();
        assert_eq!(escalation.risk, vigil_core::EscalationRisk::Emergency);
        assert!(escalation.reason.contains("PHQ-9"));
        assert!(escalation.reason.contains("27"));
        assert_eq!(escalation.notes.len(), 1);
        assert_eq!(escalation.notes[0].author, NoteAuthor::System);
        assert!(escalation.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_moderately_severe_screening_raises_high_escalation() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(calm())));

        // 2*7 + 1*2 = 16 -> moderately severe on PHQ-9
        let outcome = engine
            .process_screening(submission(Instrument::Phq9, &[2, 2, 2, 2, 2, 2, 2, 1, 1]))
            .await
            .unwrap();

        assert_eq!(outcome.result.score, 16);
        let escalation = outcome.escalation.unwrap();
        assert_eq!(escalation.risk, vigil_core::EscalationRisk::High);
    }

    #[tokio::test]
    async fn test_mild_screening_does_not_escalate() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(calm())));

        let outcome = engine
            .process_screening(submission(Instrument::Gad7, &[2, 2, 2, 1, 1, 1, 0]))
            .await
            .unwrap();

        assert_eq!(outcome.result.score, 9);
        assert!(outcome.escalation.is_none());

        let queue = engine.escalations(EscalationFilter::new()).await.unwrap();
        assert!(queue.is_empty());

        // The result itself is still persisted.
        let history = engine
            .screening_history(&SubjectId::new("stu-1"))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_emergency_escalates_and_references_turn() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(crisis())));
        let subject = SubjectId::new("stu-1");

        let outcome = engine
            .process_message(subject.clone(), "I can't go on")
            .await
            .unwrap();

        let escalation = outcome.escalation.unwrap();
        assert_eq!(escalation.triggering_turn, Some(outcome.turn.id));
        assert!(escalation.reason.contains("crisis"));
        assert!(escalation.reason.contains("0.93"));

        // Both sides of the exchange were persisted, chronological.
        let conversation = engine.conversation(&subject).await.unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].sender, vigil_core::Sender::Subject);
        assert_eq!(conversation[1].sender, vigil_core::Sender::Assistant);
    }

    #[tokio::test]
    async fn test_one_open_emergency_per_subject() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(crisis())));
        let subject = SubjectId::new("stu-1");

        let first = engine
            .process_message(subject.clone(), "I want to give up")
            .await
            .unwrap();
        let second = engine
            .process_message(subject.clone(), "nothing helps")
            .await
            .unwrap();

        assert!(first.escalation.is_some());
        assert!(second.escalation.is_none());

        // Resolving the open one re-arms escalation for the subject.
        engine
            .transition(first.escalation.unwrap().id, EscalationStatus::Resolved)
            .await
            .unwrap();
        let third = engine
            .process_message(subject.clone(), "it's back again")
            .await
            .unwrap();
        assert!(third.escalation.is_some());
    }

    #[tokio::test]
    async fn test_calm_message_never_escalates() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(calm())));

        let outcome = engine
            .process_message(SubjectId::new("stu-1"), "exams soon, bit nervous")
            .await
            .unwrap();

        assert!(outcome.escalation.is_none());
        assert_eq!(outcome.classification.risk, MessageRisk::Low);
    }

    #[tokio::test]
    async fn test_degraded_high_is_stored_but_not_escalated() {
        let mut degraded = calm();
        degraded.risk = MessageRisk::High;
        degraded.degraded = true;
        let engine = engine_with(Arc::new(MockAnalyzer::returning(degraded)));

        let outcome = engine
            .process_message(SubjectId::new("stu-1"), "hello?")
            .await
            .unwrap();

        assert!(outcome.escalation.is_none());
        let stored = outcome.turn.classification.unwrap();
        assert!(stored.degraded);
        assert_eq!(stored.risk, MessageRisk::High);
    }

    #[tokio::test]
    async fn test_analyzer_receives_bounded_history() {
        let analyzer = Arc::new(MockAnalyzer::returning(calm()));
        let engine = engine_with(analyzer.clone());
        let subject = SubjectId::new("stu-1");

        for i in 0..6 {
            engine
                .process_message(subject.clone(), format!("message {i}"))
                .await
                .unwrap();
        }

        let seen = analyzer.seen_history.lock().unwrap();
        // First call sees no history; later calls are capped at the window.
        assert_eq!(seen[0], 0);
        assert!(seen.iter().all(|&n| n <= 5));
        assert_eq!(*seen.last().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_manual_report_validates_risk() {
        let engine = engine_with(Arc::new(MockAnalyzer::returning(calm())));

        let escalation = engine
            .report_manual(
                SubjectId::new("stu-2"),
                MessageRisk::High,
                "counselor walk-in report",
            )
            .await
            .unwrap();
        assert_eq!(escalation.risk, vigil_core::EscalationRisk::High);

        let err = engine
            .report_manual(SubjectId::new("stu-2"), MessageRisk::Low, "not serious")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRiskLevel(_)));
    }
}
