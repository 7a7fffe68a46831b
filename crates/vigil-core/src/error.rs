//! Error types for Vigil

/// Result type alias using Vigil's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for triage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or incomplete screening answers, rejected before scoring
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// Escalation creation requested with a risk level outside the allowed set
    #[error("invalid risk level: {0}")]
    InvalidRiskLevel(String),

    /// Operation on a nonexistent record
    #[error("not found: {0}")]
    NotFound(String),

    /// Mutation attempted on a record whose state forbids it
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Escalation status transition outside the legal table
    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    /// External risk model unreachable or returned garbage.
    /// Internal to the classifier adapter; callers receive a degraded
    /// classification, never this error.
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new invalid-submission error
    pub fn invalid_submission(msg: impl Into<String>) -> Self {
        Self::InvalidSubmission(msg.into())
    }

    /// Create a new invalid-risk-level error
    pub fn invalid_risk_level(msg: impl Into<String>) -> Self {
        Self::InvalidRiskLevel(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new illegal-state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Create a new illegal-transition error
    pub fn illegal_transition(msg: impl Into<String>) -> Self {
        Self::IllegalTransition(msg.into())
    }

    /// Create a new classifier-unavailable error
    pub fn classifier_unavailable(msg: impl Into<String>) -> Self {
        Self::ClassifierUnavailable(msg.into())
    }
}
