//! Live turn processing: resolve the conversation, advance the machine, and
//! record the turn.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{ChatReply, ChatRequest, TurnProcessor};
use crate::error::{DatabaseError, TurnError};
use crate::form::{ConversationMachine, ConversationState, Transition, TurnKind};
use crate::session;
use crate::store::{APPEARANCE_FORM_TYPE, ConversationUpdate, Database, Sender};

/// Processes turns against the database.
pub struct PersistentTurnProcessor {
    db: Arc<dyn Database>,
    machine: ConversationMachine,
}

impl PersistentTurnProcessor {
    pub fn new(db: Arc<dyn Database>, machine: ConversationMachine) -> Self {
        Self { db, machine }
    }

    /// Write the turn's effects. Returns the state to hand back to the client.
    ///
    /// State changes are written first under the revision guard, so a stale
    /// turn fails before anything is appended to the message log. The writes
    /// are not atomic: if the guarded update lands and a message insert then
    /// fails, the stored state has advanced without its transcript entries and
    /// a retry with the old state is rejected as stale. The client recovers by
    /// resuming with its session id.
    async fn record(
        &self,
        conversation_id: &str,
        before: &ConversationState,
        transition: &Transition,
        message: Option<&str>,
        mut order: u32,
    ) -> Result<ConversationState, TurnError> {
        let db = self.db.as_ref();
        let user_text = message.unwrap_or_default();
        let mut state = transition.state.clone();

        match transition.kind {
            TurnKind::Greeting => {
                db.save_message(conversation_id, &transition.display_text(), Sender::Ai, order)
                    .await?;
            }
            TurnKind::Accepted | TurnKind::Completed => {
                let update = ConversationUpdate::from_state(&transition.state);
                let stored = db
                    .update_conversation(conversation_id, &update, before.revision)
                    .await
                    .map_err(TurnError::from_storage)?;
                state.revision = stored.revision;

                log_exchange(db, conversation_id, user_text, &transition.response, order)
                    .await
                    .inspect_err(|e| {
                        warn!(
                            conversation_id = %conversation_id,
                            revision = stored.revision,
                            error = %e,
                            "State advanced but transcript write failed"
                        )
                    })?;
            }
            TurnKind::Rejected => {
                log_exchange(db, conversation_id, user_text, &transition.response, order).await?;
            }
            TurnKind::Confirmed => {
                db.save_message(conversation_id, user_text, Sender::User, order)
                    .await?;
                order += 1;
                let submission = db
                    .create_form_submission(conversation_id, &state.form_data, APPEARANCE_FORM_TYPE)
                    .await?;
                debug!(submission_id = %submission.id, "Submission recorded");
                db.save_message(conversation_id, &transition.response, Sender::Ai, order)
                    .await?;
            }
            TurnKind::Fallback => {}
        }

        Ok(state)
    }
}

/// Append a user message and the reply to it at `order` and `order + 1`.
async fn log_exchange(
    db: &dyn Database,
    conversation_id: &str,
    user_text: &str,
    reply: &str,
    order: u32,
) -> Result<(), DatabaseError> {
    db.save_message(conversation_id, user_text, Sender::User, order)
        .await?;
    db.save_message(conversation_id, reply, Sender::Ai, order + 1)
        .await?;
    Ok(())
}

#[async_trait]
impl TurnProcessor for PersistentTurnProcessor {
    async fn process(&self, request: ChatRequest) -> Result<ChatReply, TurnError> {
        let resolved = session::resolve(
            self.db.as_ref(),
            request.conversation_state,
            request.session_id.as_deref(),
        )
        .await
        .map_err(TurnError::from_storage)?;

        let message = request.message.as_deref();
        let transition = self.machine.advance(&resolved.state, message);

        let state = match resolved.state.conversation_id.as_deref() {
            Some(conversation_id) => {
                self.record(
                    conversation_id,
                    &resolved.state,
                    &transition,
                    message,
                    resolved.next_order,
                )
                .await?
            }
            None => transition.state.clone(),
        };

        info!(
            session_id = state.session_id.as_deref().unwrap_or("-"),
            kind = %transition.kind,
            step = state.current_step,
            "Turn processed"
        );
        Ok(ChatReply::from_transition(transition, state))
    }
}
