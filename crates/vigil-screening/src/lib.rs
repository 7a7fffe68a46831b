//! Vigil Screening
//!
//! Standardized questionnaire scoring for the triage engine.
//!
//! Supports the PHQ-9 depression and GAD-7 anxiety instruments with their
//! published clinical severity cutoffs. Scoring is pure: validation and
//! band lookup only, no persistence and no escalation decisions.

pub mod instrument;
pub mod scorer;

pub use instrument::{Instrument, SeverityBand};
pub use scorer::{score, Answer, ScreeningResult, ScreeningSubmission};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::instrument::Instrument;
    pub use crate::scorer::{score, Answer, ScreeningResult, ScreeningSubmission};
}
