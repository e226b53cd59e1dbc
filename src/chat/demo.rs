//! Demo turn processing: a scripted walkthrough that fills the form with
//! sample answers regardless of what the user types. Nothing is stored.

use async_trait::async_trait;
use tracing::info;

use super::{ChatReply, ChatRequest, TurnProcessor};
use crate::error::TurnError;
use crate::form::catalog::fields;
use crate::form::{ConversationMachine, ConversationState, TurnKind};
use crate::session;

/// Sample answer used for `field` in demo conversations.
pub fn sample_answer(field: &str) -> &'static str {
    match field {
        fields::COUNTY => "Marion",
        fields::COURT => "Superior Court",
        fields::CASE_NUMBER => "49D01-2024-EV-001234",
        fields::PLAINTIFF => "ABC Property Management",
        fields::DEFENDANT => "John Smith",
        fields::AGREE_TO_NOTIFY => "yes",
        fields::MAILING_ADDRESS => "123 Main St, Indianapolis, IN 46202",
        fields::PHONE => "(317) 555-0123",
        fields::EMAIL => "john.smith@email.com",
        _ => "Sample answer",
    }
}

pub struct DemoTurnProcessor {
    machine: ConversationMachine,
}

impl DemoTurnProcessor {
    pub fn new(machine: ConversationMachine) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl TurnProcessor for DemoTurnProcessor {
    async fn process(&self, request: ChatRequest) -> Result<ChatReply, TurnError> {
        let state = request.conversation_state.unwrap_or_else(|| {
            let session_id = request
                .session_id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(session::generate_session_id);
            ConversationState::fresh(session_id, None)
        });

        let message = request.message.filter(|m| !m.is_empty());
        let scripted = match self.machine.catalog().at(state.current_step) {
            Some(question) if message.is_some() => Some(sample_answer(&question.field).to_string()),
            _ => message,
        };

        let mut transition = self.machine.advance(&state, scripted.as_deref());
        // Only the first answer is thanked; later steps go straight to the prompt.
        if transition.kind == TurnKind::Accepted && transition.state.current_step > 1 {
            if let Some(question) = self.machine.catalog().at(transition.state.current_step) {
                transition.response = question.prompt.clone();
            }
        }
        info!(kind = %transition.kind, step = transition.state.current_step, "Demo turn");
        let next = transition.state.clone();
        Ok(ChatReply::from_transition(transition, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> DemoTurnProcessor {
        DemoTurnProcessor::new(ConversationMachine::appearance_form())
    }

    fn say(message: &str, state: ConversationState) -> ChatRequest {
        ChatRequest {
            message: Some(message.to_string()),
            conversation_state: Some(state),
            session_id: None,
        }
    }

    #[tokio::test]
    async fn greeting_generates_session() {
        let reply = processor().process(ChatRequest::default()).await.unwrap();
        assert!(reply.response.starts_with("Hello!"));
        let state = reply.conversation_state;
        assert!(state.session_id.unwrap().starts_with("session_"));
        assert!(state.conversation_id.is_none());
    }

    #[tokio::test]
    async fn any_text_fills_sample_answers() {
        let p = processor();
        let mut state = p
            .process(ChatRequest::default())
            .await
            .unwrap()
            .conversation_state;
        let mut last = None;
        for _ in 0..9 {
            let reply = p.process(say("whatever", state)).await.unwrap();
            state = reply.conversation_state.clone();
            last = Some(reply);
        }
        assert_eq!(last.unwrap().form_completed, Some(true));
        assert!(state.completed);
        assert_eq!(state.form_data.text(fields::COUNTY), Some("Marion"));
        assert_eq!(state.form_data.flag(fields::AGREE_TO_NOTIFY), Some(true));
        assert_eq!(
            state.form_data.text(fields::EMAIL),
            Some("john.smith@email.com")
        );

        let reply = p.process(say("yes", state.clone())).await.unwrap();
        assert_eq!(reply.generate_pdf, Some(true));

        let reply = p.process(say("later", state)).await.unwrap();
        assert!(reply.generate_pdf.is_none());
        assert!(reply.response.starts_with("I'm sorry"));
    }

    #[tokio::test]
    async fn only_first_answer_is_thanked() {
        let p = processor();
        let greeting = p.process(ChatRequest::default()).await.unwrap();

        let first = p
            .process(say("anything", greeting.conversation_state))
            .await
            .unwrap();
        assert!(first.response.starts_with("Thank you! And right below the County"));

        let second = p
            .process(say("anything", first.conversation_state))
            .await
            .unwrap();
        assert!(second.response.starts_with("Great. Now, what is the Case Number?"));

        let third = p
            .process(say("anything", second.conversation_state))
            .await
            .unwrap();
        assert_eq!(
            third.response,
            "What is the full name of the person or company suing you (the Plaintiff)?"
        );
    }

    #[tokio::test]
    async fn supplied_session_is_kept() {
        let reply = processor()
            .process(ChatRequest {
                session_id: Some("session_1_demo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            reply.conversation_state.session_id.as_deref(),
            Some("session_1_demo")
        );
    }
}
