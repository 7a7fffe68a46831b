//! Local crisis-phrase guard
//!
//! A lexicon-based screen that runs on every message, independent of the
//! external risk model. A hit forces an emergency classification, so an
//! explicit crisis statement is caught even while the model is unreachable.

use aho_corasick::AhoCorasick;
use vigil_core::{Error, Result};

/// Phrases that indicate an acute crisis regardless of model output.
///
/// Multi-word phrases only; single common words produce too many substring
/// false positives.
const CRISIS_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "want to die",
    "end my life",
    "hurt myself",
    "hang myself",
    "cut myself",
    "shoot myself",
    "overdose",
    "no reason to live",
    "better off dead",
];

/// Fast crisis-phrase matcher over a fixed lexicon
pub struct CrisisGuard {
    phrases: AhoCorasick,
}

impl CrisisGuard {
    /// Build the guard from the built-in lexicon
    pub fn new() -> Result<Self> {
        let phrases = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(CRISIS_PHRASES)
            .map_err(|e| {
                Error::classifier_unavailable(format!("failed to build crisis matcher: {e}"))
            })?;

        Ok(Self { phrases })
    }

    /// Return the first matched crisis phrase, if any
    pub fn check(&self, text: &str) -> Option<&'static str> {
        self.phrases
            .find(text)
            .map(|m| CRISIS_PHRASES[m.pattern().as_usize()])
    }
}
