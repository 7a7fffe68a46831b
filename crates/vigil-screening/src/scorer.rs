//! Questionnaire scoring
//!
//! `score` is a pure function from a completed submission to a screening
//! result; persistence and escalation decisions belong to the caller. A
//! submission is validated in full before any scoring happens, so a rejected
//! submission is never partially scored.

use crate::instrument::Instrument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::{Error, Result, ScreeningSeverity, SubjectId};

/// One answered question: question index paired with the chosen value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Zero-based question index within the instrument
    #[serde(rename = "qid")]
    pub question: usize,

    /// Chosen value, 0..=3
    #[serde(rename = "answer")]
    pub value: u8,
}

/// A completed questionnaire awaiting scoring. Immutable once scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningSubmission {
    /// Which questionnaire was taken
    pub instrument: Instrument,

    /// Subject who completed it
    pub subject: SubjectId,

    /// One entry per question, in presentation order
    pub answers: Vec<Answer>,
}

/// Scored screening outcome. Created exactly once per submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    /// Subject who completed the questionnaire
    pub subject: SubjectId,

    /// Which questionnaire was taken
    pub instrument: Instrument,

    /// Raw answers as submitted
    pub answers: Vec<Answer>,

    /// Sum of all answer values
    pub score: u16,

    /// Severity tier from the instrument's band table
    pub severity: ScreeningSeverity,

    /// When the result was produced
    pub created_at: DateTime<Utc>,
}

/// Score a completed submission.
///
/// The submission must contain exactly one answer per question index defined
/// by the instrument, each value in 0..=3; any violation fails with
/// `InvalidSubmission` before scoring.
pub fn score(submission: ScreeningSubmission) -> Result<ScreeningResult> {
    validate(&submission)?;

    let total: u16 = submission.answers.iter().map(|a| a.value as u16).sum();
    let severity = submission.instrument.severity_for(total);

    debug!(
        instrument = %submission.instrument,
        subject = %submission.subject,
        score = total,
        severity = %severity,
        "scored screening submission"
    );

    Ok(ScreeningResult {
        subject: submission.subject,
        instrument: submission.instrument,
        answers: submission.answers,
        score: total,
        severity,
        created_at: Utc::now(),
    })
}

fn validate(submission: &ScreeningSubmission) -> Result<()> {
    let expected = submission.instrument.question_count();

    if submission.answers.len() != expected {
        return Err(Error::invalid_submission(format!(
            "{} expects {} answers, got {}",
            submission.instrument,
            expected,
            submission.answers.len()
        )));
    }

    let mut seen = vec![false; expected];
    for answer in &submission.answers {
        if answer.question >= expected {
            return Err(Error::invalid_submission(format!(
                "question index {} out of range for {}",
                answer.question, submission.instrument
            )));
        }
        if seen[answer.question] {
            return Err(Error::invalid_submission(format!(
                "duplicate answer for question {}",
                answer.question
            )));
        }
        seen[answer.question] = true;

        if answer.value > Instrument::MAX_ANSWER {
            return Err(Error::invalid_submission(format!(
                "answer value {} for question {} outside 0..=3",
                answer.value, answer.question
            )));
        }
    }

    Ok(())
}
