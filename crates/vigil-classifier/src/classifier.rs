//! Chat risk classifier
//!
//! Wraps the external risk model behind the `RiskAnalyzer` contract: bounded
//! history window, crisis-phrase guard, and an explicit degraded fallback
//! when the model cannot be reached.

use crate::analyzer::RiskAnalyzer;
use crate::guard::CrisisGuard;
use crate::remote::{HistoryEntry, PredictRequest, PredictResponse, RemoteModelClient};
use crate::replies;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use vigil_core::{Classification, ConversationTurn, MessageRisk, Result};

/// Risk tier assumed when the model is unreachable.
///
/// The permissive default cannot catch an emergency during an outage; the
/// cautious one forces human follow-up on every outage instead. Which to run
/// is a deployment policy, so it is configuration rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Degraded results carry `High` risk, surfacing them to responders
    #[default]
    Cautious,
    /// Degraded results carry `Low` risk (the upstream system's behavior)
    Permissive,
}

impl FallbackPolicy {
    /// Risk tier a degraded classification carries under this policy
    pub fn risk(&self) -> MessageRisk {
        match self {
            Self::Cautious => MessageRisk::High,
            Self::Permissive => MessageRisk::Low,
        }
    }
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the risk model service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff before the single retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// How many prior turns to send as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// What risk tier degraded results carry
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            history_window: default_history_window(),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl ClassifierConfig {
    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff before the single retry
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_history_window() -> usize {
    5
}

/// Adapter from the external risk model to the `RiskAnalyzer` contract
pub struct ChatRiskClassifier {
    client: RemoteModelClient,
    guard: CrisisGuard,
    history_window: usize,
    fallback: FallbackPolicy,
}

impl ChatRiskClassifier {
    /// Build the classifier from configuration
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = RemoteModelClient::new(
            config.endpoint.clone(),
            config.timeout(),
            config.retry_backoff(),
        )?;

        Ok(Self {
            client,
            guard: CrisisGuard::new()?,
            history_window: config.history_window,
            fallback: config.fallback,
        })
    }

    /// The most recent `window` turns in chronological (oldest-first) order,
    /// regardless of the order the store returned them in.
    fn context_window(history: &[ConversationTurn], window: usize) -> Vec<&ConversationTurn> {
        let mut turns: Vec<&ConversationTurn> = history.iter().collect();
        turns.sort_by_key(|t| t.timestamp);
        if turns.len() > window {
            turns.drain(..turns.len() - window);
        }
        turns
    }

    /// Convert a validated model response into a classification
    fn from_response(response: PredictResponse) -> Classification {
        let reply = response
            .response
            .unwrap_or_else(|| replies::default_reply(response.risk_level).to_string());

        Classification::new(
            response.risk_level,
            response.intent,
            response.confidence,
            response.emergency,
            reply,
        )
    }

    /// Explicitly degraded substitute used when the model cannot be reached
    fn fallback_classification(&self) -> Classification {
        Classification {
            risk: self.fallback.risk(),
            intent: "general".to_string(),
            confidence: 0.0,
            emergency: false,
            reply: replies::degraded_reply().to_string(),
            degraded: true,
        }
    }

    /// Emergency classification for a crisis-guard hit
    fn guard_classification(phrase: &str) -> Classification {
        info!(phrase, "crisis guard matched, forcing emergency classification");
        Classification::new(
            MessageRisk::Emergency,
            "crisis",
            1.0,
            true,
            replies::CRISIS_REPLY,
        )
    }
}

#[async_trait]
impl RiskAnalyzer for ChatRiskClassifier {
    async fn analyze(&self, message: &str, history: &[ConversationTurn]) -> Classification {
        // The guard runs before and independent of the remote call, so an
        // explicit crisis statement is classified as an emergency even while
        // the model is down.
        if let Some(phrase) = self.guard.check(message) {
            return Self::guard_classification(phrase);
        }

        let window = Self::context_window(history, self.history_window);
        let request = PredictRequest {
            message,
            history: window
                .iter()
                .map(|t| HistoryEntry::new(&t.text, t.sender))
                .collect(),
        };

        match self.client.predict(&request).await {
            Ok(response) => Self::from_response(response),
            Err(e) => {
                warn!(error = %e, policy = ?self.fallback, "risk model unavailable, degrading");
                self.fallback_classification()
            }
        }
    }

    fn name(&self) -> &str {
        "chat-risk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use vigil_core::{Sender, SubjectId, TurnId};

    fn turn_at(offset_secs: i64, text: &str) -> ConversationTurn {
        ConversationTurn {
            id: TurnId::generate(),
            subject: SubjectId::new("stu-1"),
            text: text.to_string(),
            sender: Sender::Subject,
            timestamp: Utc::now() + ChronoDuration::seconds(offset_secs),
            classification: None,
        }
    }

    #[test]
    fn test_context_window_restores_chronological_order() {
        // Newest-first, as the log store returns them.
        let history = vec![turn_at(30, "third"), turn_at(20, "second"), turn_at(10, "first")];

        let window = ChatRiskClassifier::context_window(&history, 5);
        let texts: Vec<_> = window.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_context_window_keeps_most_recent() {
        let history = vec![
            turn_at(10, "a"),
            turn_at(20, "b"),
            turn_at(30, "c"),
            turn_at(40, "d"),
        ];

        let window = ChatRiskClassifier::context_window(&history, 2);
        let texts: Vec<_> = window.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "d"]);
    }

    #[test]
    fn test_from_response_substitutes_default_reply() {
        let response = PredictResponse {
            risk_level: MessageRisk::Low,
            risk_score: 0.1,
            intent: "general".to_string(),
            intent_score: 0.5,
            emergency: false,
            confidence: 0.6,
            response: None,
        };

        let classification = ChatRiskClassifier::from_response(response);
        assert!(!classification.reply.is_empty());
        assert!(!classification.degraded);
    }

    #[tokio::test]
    async fn test_unreachable_model_yields_complete_degraded_result() {
        let config = ClassifierConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 200,
            retry_backoff_ms: 10,
            ..ClassifierConfig::default()
        };
        let classifier = ChatRiskClassifier::new(&config).unwrap();

        let result = classifier.analyze("just checking in", &[]).await;
        assert!(result.degraded);
        assert_eq!(result.risk, MessageRisk::High); // cautious default
        assert!(!result.reply.is_empty());
        assert!(!result.intent.is_empty());
        assert!(!result.is_emergency());
    }

    #[tokio::test]
    async fn test_permissive_fallback_stays_low() {
        let config = ClassifierConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 200,
            retry_backoff_ms: 10,
            fallback: FallbackPolicy::Permissive,
            ..ClassifierConfig::default()
        };
        let classifier = ChatRiskClassifier::new(&config).unwrap();

        let result = classifier.analyze("just checking in", &[]).await;
        assert!(result.degraded);
        assert_eq!(result.risk, MessageRisk::Low);
    }

    #[tokio::test]
    async fn test_crisis_guard_overrides_outage() {
        let config = ClassifierConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 200,
            retry_backoff_ms: 10,
            ..ClassifierConfig::default()
        };
        let classifier = ChatRiskClassifier::new(&config).unwrap();

        let result = classifier.analyze("I want to end my life", &[]).await;
        assert!(result.is_emergency());
        assert_eq!(result.risk, MessageRisk::Emergency);
        assert_eq!(result.intent, "crisis");
        assert!(!result.degraded);
    }
}
