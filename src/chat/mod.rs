//! Chat turns: wire types, the `TurnProcessor` seam, and its live and demo
//! implementations.

pub mod demo;
pub mod processor;
pub mod routes;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TurnError;
use crate::form::{ConversationState, Transition};

pub use demo::DemoTurnProcessor;
pub use processor::PersistentTurnProcessor;
pub use routes::{AppState, chat_routes};

/// Body of `POST /api/chat`. Every field may be absent or null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_state: Option<ConversationState>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Reply to one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_state: ConversationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_pdf: Option<bool>,
}

impl ChatReply {
    /// Reply for `transition`, carrying `state` as the new canonical state.
    pub fn from_transition(transition: Transition, state: ConversationState) -> Self {
        Self {
            response: transition.response,
            conversation_state: state,
            next_question: transition.next_question,
            form_completed: transition.form_completed.then_some(true),
            generate_pdf: transition.generate_pdf.then_some(true),
        }
    }
}

/// Runs one chat turn end to end.
#[async_trait]
pub trait TurnProcessor: Send + Sync {
    async fn process(&self, request: ChatRequest) -> Result<ChatReply, TurnError>;
}
