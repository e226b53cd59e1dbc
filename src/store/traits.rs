//! Unified `Database` trait — single async interface for all persistence.
//!
//! Three record types: conversations (one per session), the ordered message
//! log of each conversation, and form submissions created when the user asks
//! for their document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::form::{ConversationState, FormData};

/// Form type recorded on submissions of the Appearance form.
pub const APPEARANCE_FORM_TYPE: &str = "appearance_form";

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    pub id: String,
    pub session_id: String,
    pub current_step: usize,
    pub form_data: FormData,
    pub completed: bool,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Rebuild the client-facing state from the stored record.
    pub fn to_state(&self) -> ConversationState {
        ConversationState {
            current_step: self.current_step,
            form_data: self.form_data.clone(),
            completed: self.completed,
            conversation_id: Some(self.id.clone()),
            session_id: Some(self.session_id.clone()),
            revision: self.revision,
        }
    }
}

/// Partial update of a conversation. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationUpdate {
    pub current_step: Option<usize>,
    pub form_data: Option<FormData>,
    pub completed: Option<bool>,
}

impl ConversationUpdate {
    /// Update carrying every mutable field of `state`.
    pub fn from_state(state: &ConversationState) -> Self {
        Self {
            current_step: Some(state.current_step),
            form_data: Some(state.form_data.clone()),
            completed: Some(state.completed),
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "ai" => Ok(Self::Ai),
            other => Err(format!("unknown sender: {other}")),
        }
    }
}

/// One entry of a conversation's message log.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub text: String,
    pub sender: Sender,
    /// Zero-based position within the conversation.
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the form data at the moment the user asked for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmissionRecord {
    pub id: String,
    pub conversation_id: String,
    pub form_type: String,
    pub form_data: FormData,
    pub pdf_generated: bool,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence for conversations, messages, and submissions.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Conversations ───────────────────────────────────────────────

    /// Create a conversation at step 0 with empty form data.
    async fn create_conversation(
        &self,
        session_id: &str,
    ) -> Result<ConversationRecord, DatabaseError>;

    /// Look up a conversation by its session id.
    async fn get_conversation_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationRecord>, DatabaseError>;

    /// Apply `update` if the stored revision equals `expected_revision`, then
    /// bump the revision. Fails with `DatabaseError::Conflict` on mismatch and
    /// `DatabaseError::NotFound` if the conversation does not exist.
    async fn update_conversation(
        &self,
        id: &str,
        update: &ConversationUpdate,
        expected_revision: u64,
    ) -> Result<ConversationRecord, DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Append a message at `order`. A second write at the same order fails
    /// with `DatabaseError::Constraint`.
    async fn save_message(
        &self,
        conversation_id: &str,
        text: &str,
        sender: Sender,
        order: u32,
    ) -> Result<MessageRecord, DatabaseError>;

    /// All messages of a conversation, ascending by order.
    async fn get_messages_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, DatabaseError>;

    /// Number of stored messages, i.e. the next order number.
    async fn count_messages(&self, conversation_id: &str) -> Result<u32, DatabaseError>;

    // ── Form submissions ────────────────────────────────────────────

    async fn create_form_submission(
        &self,
        conversation_id: &str,
        form_data: &FormData,
        form_type: &str,
    ) -> Result<FormSubmissionRecord, DatabaseError>;

    /// Most recent submission for a conversation, if any.
    async fn get_form_submission_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FormSubmissionRecord>, DatabaseError>;

    /// Flag a submission's document as generated.
    async fn mark_pdf_generated(
        &self,
        submission_id: &str,
        pdf_url: Option<&str>,
    ) -> Result<(), DatabaseError>;
}
