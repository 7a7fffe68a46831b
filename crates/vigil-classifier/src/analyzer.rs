//! Risk analyzer trait

use async_trait::async_trait;
use vigil_core::{Classification, ConversationTurn};

/// Trait for message risk analysis.
///
/// Implementations must not fail: when the underlying capability is
/// unavailable they return a degraded classification instead of an error, so
/// a conversational flow never fails outright because of a triage outage.
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    /// Analyze a new message in the context of the subject's recent turns.
    ///
    /// `history` may arrive in any order; implementations are responsible for
    /// restoring chronological order before use.
    async fn analyze(&self, message: &str, history: &[ConversationTurn]) -> Classification;

    /// Get the analyzer name
    fn name(&self) -> &str;
}
