//! HTTP routes and handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;
use vigil_core::{Error, EscalationId, MessageRisk, ResponderId, SubjectId};
use vigil_engine::Triage;
use vigil_screening::{Answer, Instrument, ScreeningSubmission};
use vigil_store::{EscalationFilter, EscalationStatus};

/// Shared application state
pub type AppState = Arc<Triage>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/screening", post(submit_screening))
        .route("/api/screening/:subject", get(screening_history))
        .route("/api/chat", post(send_message))
        .route("/api/chat/:subject", get(chat_history))
        .route("/api/escalations", post(report_escalation).get(list_escalations))
        .route("/api/escalations/:id", get(get_escalation))
        .route("/api/escalations/:id/notes", post(add_note))
        .route("/api/escalations/:id/status", put(set_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Screening submission body, in the questionnaire wire format
#[derive(Debug, Deserialize)]
struct ScreeningRequest {
    #[serde(rename = "type")]
    instrument: Instrument,
    subject: SubjectId,
    answers: Vec<Answer>,
}

async fn submit_screening(
    State(triage): State<AppState>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Response, ApiError> {
    let outcome = triage
        .process_screening(ScreeningSubmission {
            instrument: request.instrument,
            subject: request.subject,
            answers: request.answers,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

async fn screening_history(
    State(triage): State<AppState>,
    Path(subject): Path<SubjectId>,
) -> Result<Response, ApiError> {
    let history = triage.screening_history(&subject).await?;
    Ok(Json(history).into_response())
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    subject: SubjectId,
    message: String,
}

async fn send_message(
    State(triage): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    debug!(subject = %request.subject, "chat message received");
    let outcome = triage
        .process_message(request.subject, request.message)
        .await?;
    Ok(Json(outcome).into_response())
}

async fn chat_history(
    State(triage): State<AppState>,
    Path(subject): Path<SubjectId>,
) -> Result<Response, ApiError> {
    let history = triage.conversation(&subject).await?;
    Ok(Json(history).into_response())
}

#[derive(Debug, Deserialize)]
struct ManualReportRequest {
    subject: SubjectId,
    #[serde(rename = "riskLevel")]
    risk: MessageRisk,
    reason: String,
}

async fn report_escalation(
    State(triage): State<AppState>,
    Json(request): Json<ManualReportRequest>,
) -> Result<Response, ApiError> {
    let escalation = triage
        .report_manual(request.subject, request.risk, request.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(escalation)).into_response())
}

#[derive(Debug, Deserialize)]
struct QueueQuery {
    status: Option<EscalationStatus>,
}

async fn list_escalations(
    State(triage): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> Result<Response, ApiError> {
    let mut filter = EscalationFilter::new();
    if let Some(status) = query.status {
        filter = filter.status(status);
    }

    let escalations = triage.escalations(filter).await?;
    Ok(Json(escalations).into_response())
}

async fn get_escalation(
    State(triage): State<AppState>,
    Path(id): Path<EscalationId>,
) -> Result<Response, ApiError> {
    let escalation = triage.escalation(id).await?;
    Ok(Json(escalation).into_response())
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    author: ResponderId,
    content: String,
}

async fn add_note(
    State(triage): State<AppState>,
    Path(id): Path<EscalationId>,
    Json(request): Json<NoteRequest>,
) -> Result<Response, ApiError> {
    let escalation = triage.note(id, request.author, request.content).await?;
    Ok(Json(escalation).into_response())
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: EscalationStatus,
}

async fn set_status(
    State(triage): State<AppState>,
    Path(id): Path<EscalationId>,
    Json(request): Json<StatusRequest>,
) -> Result<Response, ApiError> {
    let escalation = triage.transition(id, request.status).await?;
    Ok(Json(escalation).into_response())
}

/// Engine error mapped onto an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            Error::InvalidSubmission(_) | Error::InvalidRiskLevel(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::IllegalState(_) | Error::IllegalTransition(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "message": self.0.to_string() }));
        (status, body).into_response()
    }
}
