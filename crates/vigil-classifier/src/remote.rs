//! Remote risk model client
//!
//! Speaks the prediction API of the external model service:
//! `POST {endpoint}/predict/chat` with the new message and the chronological
//! history window. The endpoint is untrusted: every call carries a bounded
//! timeout, and the response is schema-validated before use. A structurally
//! invalid body is treated identically to a transport failure.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use vigil_core::{Error, MessageRisk, Result, Sender};

/// Request body for `/predict/chat`
#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    /// The new, not-yet-persisted message
    pub message: &'a str,

    /// Prior turns, oldest first
    pub history: Vec<HistoryEntry<'a>>,
}

/// One prior turn as the model expects it
#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
    pub message: &'a str,
    pub sender: &'a str,
}

impl<'a> HistoryEntry<'a> {
    /// Map a turn's sender into the model's wire vocabulary
    pub fn new(message: &'a str, sender: Sender) -> Self {
        let sender = match sender {
            Sender::Subject => "user",
            Sender::Assistant => "bot",
        };
        Self { message, sender }
    }
}

/// Schema-validated response from `/predict/chat`.
///
/// All fields except `response` are required; a missing or mistyped field
/// fails deserialization and routes to the fallback path.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "riskLevel")]
    pub risk_level: MessageRisk,

    #[serde(rename = "riskScore")]
    pub risk_score: f32,

    pub intent: String,

    #[serde(rename = "intentScore")]
    pub intent_score: f32,

    pub emergency: bool,

    pub confidence: f32,

    /// Suggested reply; absent when the model has none to offer
    #[serde(default)]
    pub response: Option<String>,
}

/// HTTP client for the external risk model
pub struct RemoteModelClient {
    http: reqwest::Client,
    endpoint: String,
    retry_backoff: Duration,
}

impl RemoteModelClient {
    /// Create a client for the given endpoint with a per-call timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration, retry_backoff: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::classifier_unavailable(format!("failed to build client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            retry_backoff,
        })
    }

    /// Call the model, retrying once after a short backoff.
    ///
    /// A single retry keeps transient blips from degrading the result
    /// without compounding conversational latency on a real outage.
    pub async fn predict(&self, request: &PredictRequest<'_>) -> Result<PredictResponse> {
        match self.predict_once(request).await {
            Ok(response) => Ok(response),
            Err(first) => {
                warn!(error = %first, "risk model call failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.predict_once(request).await
            }
        }
    }

    async fn predict_once(&self, request: &PredictRequest<'_>) -> Result<PredictResponse> {
        let url = format!("{}/predict/chat", self.endpoint);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::classifier_unavailable("risk model call timed out")
                } else {
                    Error::classifier_unavailable(format!("risk model unreachable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::classifier_unavailable(format!(
                "risk model returned {status}"
            )));
        }

        let parsed: PredictResponse = response.json().await.map_err(|e| {
            Error::classifier_unavailable(format!("malformed risk model response: {e}"))
        })?;

        debug!(
            risk = %parsed.risk_level,
            intent = %parsed.intent,
            emergency = parsed.emergency,
            "risk model responded"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_schema_accepts_full_body() {
        let body = r#"{
            "riskLevel": "medium",
            "riskScore": 0.61,
            "intent": "academic_stress",
            "intentScore": 0.8,
            "emergency": false,
            "confidence": 0.7,
            "response": "Exams can be stressful."
        }"#;

        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.risk_level, MessageRisk::Medium);
        assert_eq!(parsed.response.as_deref(), Some("Exams can be stressful."));
    }

    #[test]
    fn test_response_schema_allows_missing_reply_only() {
        let body = r#"{
            "riskLevel": "low",
            "riskScore": 0.1,
            "intent": "general",
            "intentScore": 0.5,
            "emergency": false,
            "confidence": 0.4
        }"#;
        assert!(serde_json::from_str::<PredictResponse>(body).is_ok());

        // A required field missing must fail validation, not default.
        let body = r#"{"riskLevel": "low", "intent": "general"}"#;
        assert!(serde_json::from_str::<PredictResponse>(body).is_err());

        // A mistyped field is equally invalid.
        let body = r#"{
            "riskLevel": "low",
            "riskScore": "high",
            "intent": "general",
            "intentScore": 0.5,
            "emergency": false,
            "confidence": 0.4
        }"#;
        assert!(serde_json::from_str::<PredictResponse>(body).is_err());
    }

    #[test]
    fn test_history_entry_sender_vocabulary() {
        let entry = HistoryEntry::new("hi", Sender::Subject);
        assert_eq!(entry.sender, "user");

        let entry = HistoryEntry::new("hello", Sender::Assistant);
        assert_eq!(entry.sender, "bot");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_classifier_unavailable() {
        let client = RemoteModelClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
        .unwrap();

        let request = PredictRequest {
            message: "hello",
            history: Vec::new(),
        };

        let err = client.predict(&request).await.unwrap_err();
        assert!(matches!(err, Error::ClassifierUnavailable(_)));
    }
}
