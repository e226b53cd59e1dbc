//! HTTP endpoints for chat turns, transcripts, submissions, and documents.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use super::{ChatRequest, TurnProcessor};
use crate::config::ServerMode;
use crate::error::TurnError;
use crate::form::FormData;
use crate::pdf;
use crate::store::{Database, FormSubmissionRecord, MessageRecord, Sender};

const PDF_FILENAME: &str = "Appearance_Form.pdf";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<dyn TurnProcessor>,
    /// Storage for transcript and submission lookups (None in demo mode).
    pub db: Option<Arc<dyn Database>>,
    pub mode: ServerMode,
}

/// Build the Axum router. `cors_origin` restricts browser access to one
/// origin; `None` allows any.
pub fn chat_routes(state: AppState, cors_origin: Option<&str>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/history", get(chat_history))
        .route("/api/generate-pdf", post(generate_pdf))
        .route("/api/submissions/{conversation_id}", get(get_submission))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring invalid CORS origin, allowing any");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "legal-navigator",
        "mode": state.mode.as_str(),
    }))
}

// ── Chat ────────────────────────────────────────────────────────────────

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed chat request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match state.processor.process(request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(TurnError::StaleState { revision }) => {
            info!(revision, "Rejected turn on stale conversation state");
            error_response(StatusCode::CONFLICT, "Conversation state is out of date")
        }
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryMessage {
    text: String,
    sender: Sender,
    order: u32,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for HistoryMessage {
    fn from(m: MessageRecord) -> Self {
        Self {
            text: m.text,
            sender: m.sender,
            order: m.order,
            created_at: m.created_at,
        }
    }
}

/// GET /api/chat/history?sessionId=…
///
/// Returns the stored transcript of a session, oldest first.
async fn chat_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let Some(session_id) = params.session_id.filter(|s| !s.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "sessionId is required");
    };
    let Some(db) = state.db.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "Conversation not found");
    };

    let conversation = match db.get_conversation_by_session_id(&session_id).await {
        Ok(Some(c)) => c,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Conversation not found"),
        Err(e) => {
            error!(error = %e, "History lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match db.get_messages_by_conversation_id(&conversation.id).await {
        Ok(messages) => Json(serde_json::json!({
            "sessionId": conversation.session_id,
            "conversationId": conversation.id,
            "messages": messages.into_iter().map(HistoryMessage::from).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "History lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── Submissions ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionView {
    id: String,
    conversation_id: String,
    form_type: String,
    form_data: FormData,
    pdf_generated: bool,
    pdf_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FormSubmissionRecord> for SubmissionView {
    fn from(s: FormSubmissionRecord) -> Self {
        Self {
            id: s.id,
            conversation_id: s.conversation_id,
            form_type: s.form_type,
            form_data: s.form_data,
            pdf_generated: s.pdf_generated,
            pdf_url: s.pdf_url,
            created_at: s.created_at,
        }
    }
}

async fn get_submission(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Response {
    let Some(db) = state.db.as_ref() else {
        return error_response(StatusCode::NOT_FOUND, "Submission not found");
    };
    match db.get_form_submission_by_conversation_id(&conversation_id).await {
        Ok(Some(submission)) => Json(SubmissionView::from(submission)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Submission not found"),
        Err(e) => {
            error!(error = %e, "Submission lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── Documents ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePdfRequest {
    #[serde(default)]
    form_data: Option<FormData>,
    #[serde(default)]
    conversation_id: Option<String>,
}

async fn generate_pdf(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePdfRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed generate-pdf request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    let Some(form_data) = request.form_data else {
        return error_response(StatusCode::BAD_REQUEST, "Form data is required");
    };

    let today = chrono::Local::now().date_naive();
    let bytes = match pdf::render_appearance_form(&form_data, today) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "PDF rendering failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if let (Some(db), Some(conversation_id)) = (state.db.as_ref(), request.conversation_id) {
        mark_generated(db.as_ref(), &conversation_id).await;
    }

    info!(bytes = bytes.len(), "Appearance form generated");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{PDF_FILENAME}\""),
            ),
            (header::CONTENT_LENGTH, bytes.len().to_string()),
        ],
        bytes,
    )
        .into_response()
}

/// Flag the conversation's latest submission as generated. Failures are
/// logged; the document is still returned.
async fn mark_generated(db: &dyn Database, conversation_id: &str) {
    match db.get_form_submission_by_conversation_id(conversation_id).await {
        Ok(Some(submission)) => {
            if let Err(e) = db.mark_pdf_generated(&submission.id, None).await {
                warn!(error = %e, conversation_id = %conversation_id, "Could not mark PDF generated");
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, conversation_id = %conversation_id, "Submission lookup failed");
        }
    }
}
