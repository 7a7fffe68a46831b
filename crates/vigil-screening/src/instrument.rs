//! Screening instruments and their clinical threshold tables
//!
//! The severity bands are the published clinical cutoffs for each
//! questionnaire. They are fixed per instrument and must not be altered per
//! deployment.

use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_core::ScreeningSeverity;

/// A severity band: inclusive score range mapped to a severity tier
#[derive(Debug, Clone, Copy)]
pub struct SeverityBand {
    /// Lowest score in the band (inclusive)
    pub min: u16,
    /// Highest score in the band (inclusive)
    pub max: u16,
    /// Severity assigned to scores in the band
    pub severity: ScreeningSeverity,
}

const fn band(min: u16, max: u16, severity: ScreeningSeverity) -> SeverityBand {
    SeverityBand { min, max, severity }
}

/// PHQ-9 depression screening: 9 items, max score 27
static PHQ9_BANDS: &[SeverityBand] = &[
    band(0, 4, ScreeningSeverity::None),
    band(5, 9, ScreeningSeverity::Mild),
    band(10, 14, ScreeningSeverity::Moderate),
    band(15, 19, ScreeningSeverity::ModeratelySevere),
    band(20, 27, ScreeningSeverity::Severe),
];

/// GAD-7 anxiety screening: 7 items, max score 21. No moderately-severe tier.
static GAD7_BANDS: &[SeverityBand] = &[
    band(0, 4, ScreeningSeverity::None),
    band(5, 9, ScreeningSeverity::Mild),
    band(10, 14, ScreeningSeverity::Moderate),
    band(15, 21, ScreeningSeverity::Severe),
];

/// A standardized screening questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    /// 9-item depression instrument
    #[serde(rename = "PHQ9")]
    Phq9,
    /// 7-item anxiety instrument
    #[serde(rename = "GAD7")]
    Gad7,
}

impl Instrument {
    /// Number of questions in the instrument
    pub fn question_count(&self) -> usize {
        match self {
            Self::Phq9 => 9,
            Self::Gad7 => 7,
        }
    }

    /// Maximum item answer value (answers are 0..=3 on both instruments)
    pub const MAX_ANSWER: u8 = 3;

    /// Maximum attainable score
    pub fn max_score(&self) -> u16 {
        self.question_count() as u16 * Self::MAX_ANSWER as u16
    }

    /// The instrument's severity band table
    pub fn bands(&self) -> &'static [SeverityBand] {
        match self {
            Self::Phq9 => PHQ9_BANDS,
            Self::Gad7 => GAD7_BANDS,
        }
    }

    /// Map a total score to its severity tier.
    ///
    /// The band tables are exhaustive over `0..=max_score`, so a lookup miss
    /// is unreachable for validated submissions; out-of-range scores land in
    /// the top band.
    pub fn severity_for(&self, score: u16) -> ScreeningSeverity {
        self.bands()
            .iter()
            .find(|b| score >= b.min && score <= b.max)
            .map(|b| b.severity)
            .unwrap_or(ScreeningSeverity::Severe)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phq9 => f.write_str("PHQ-9"),
            Self::Gad7 => f.write_str("GAD-7"),
        }
    }
}
