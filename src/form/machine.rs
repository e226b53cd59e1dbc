//! Conversation state machine: decides the outcome of each turn.
//!
//! The walk is linear: one accepted answer advances one catalog step. The only
//! conditional gate is yes/no coercion, which re-prompts without advancing.
//! After the last answer the conversation is complete and a "yes" asks for the
//! document to be generated. Every input has a defined outcome, so `advance`
//! never fails.

use std::sync::Arc;

use super::catalog::QuestionCatalog;
use super::model::ConversationState;

/// Fixed response texts used by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub welcome: String,
    /// Prefix placed before the next question after an accepted answer.
    pub thanks_prefix: String,
    pub yes_no_reprompt: String,
    pub completed: String,
    pub generating: String,
    pub fallback: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            welcome: "Hello! I'm here to help you fill out your Appearance form for your eviction case in Indiana. I'll ask you a series of questions to gather the information needed for your court documents. Let's get started!".to_string(),
            thanks_prefix: "Thank you! ".to_string(),
            yes_no_reprompt: "Please answer 'yes' or 'no' to whether you agree to notify the court of address changes.".to_string(),
            completed: "Perfect! I've collected all the information needed for your Appearance form. Your form is now ready to be generated. Would you like me to create your PDF document?".to_string(),
            generating: "Great! I'll generate your PDF now. Please wait a moment...".to_string(),
            fallback: "I'm sorry, I didn't understand that. Could you please try again?".to_string(),
        }
    }
}

/// Which rule produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Greeting,
    Accepted,
    Completed,
    Rejected,
    Confirmed,
    Fallback,
}

impl std::fmt::Display for TurnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Confirmed => "confirmed",
            Self::Fallback => "fallback",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub kind: TurnKind,
    pub state: ConversationState,
    pub response: String,
    pub next_question: Option<String>,
    pub form_completed: bool,
    pub generate_pdf: bool,
}

impl Transition {
    fn unchanged(kind: TurnKind, state: &ConversationState, response: &str) -> Self {
        Self {
            kind,
            state: state.clone(),
            response: response.to_string(),
            next_question: None,
            form_completed: false,
            generate_pdf: false,
        }
    }

    /// The AI text as the client displays it (response plus any follow-up question).
    pub fn display_text(&self) -> String {
        match &self.next_question {
            Some(q) => format!("{}\n\n{}", self.response, q),
            None => self.response.clone(),
        }
    }
}

/// Pure turn decider over an injected catalog.
#[derive(Debug, Clone)]
pub struct ConversationMachine {
    catalog: Arc<QuestionCatalog>,
    script: Script,
}

impl ConversationMachine {
    pub fn new(catalog: Arc<QuestionCatalog>, script: Script) -> Self {
        Self { catalog, script }
    }

    /// Machine for the Indiana Appearance form with the default script.
    pub fn appearance_form() -> Self {
        Self::new(Arc::new(QuestionCatalog::appearance_form()), Script::default())
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Decide the outcome of one turn.
    ///
    /// A message counts as present only when it is non-empty; whitespace-only
    /// input is present and coerces to an empty answer.
    pub fn advance(&self, state: &ConversationState, message: Option<&str>) -> Transition {
        let message = message.filter(|m| !m.is_empty());
        let total = self.catalog.len();

        let Some(message) = message else {
            if state.current_step == 0 {
                return self.greeting(state);
            }
            return Transition::unchanged(TurnKind::Fallback, state, &self.script.fallback);
        };

        if state.current_step < total {
            return self.answer(state, message);
        }

        if state.completed && message.to_lowercase().contains("yes") {
            let mut t = Transition::unchanged(TurnKind::Confirmed, state, &self.script.generating);
            t.generate_pdf = true;
            return t;
        }

        Transition::unchanged(TurnKind::Fallback, state, &self.script.fallback)
    }

    fn greeting(&self, state: &ConversationState) -> Transition {
        let mut t = Transition::unchanged(TurnKind::Greeting, state, &self.script.welcome);
        t.next_question = self.catalog.at(0).map(|q| q.prompt.clone());
        t
    }

    fn answer(&self, state: &ConversationState, message: &str) -> Transition {
        let Some(question) = self.catalog.at(state.current_step) else {
            return Transition::unchanged(TurnKind::Fallback, state, &self.script.fallback);
        };

        let Some(value) = question.coercion.apply(message) else {
            return Transition::unchanged(TurnKind::Rejected, state, &self.script.yes_no_reprompt);
        };

        let mut next = state.clone();
        next.form_data.set(question.field.clone(), value);
        next.current_step += 1;

        match self.catalog.at(next.current_step) {
            Some(following) => Transition {
                kind: TurnKind::Accepted,
                response: format!("{}{}", self.script.thanks_prefix, following.prompt),
                state: next,
                next_question: None,
                form_completed: false,
                generate_pdf: false,
            },
            None => {
                next.completed = true;
                Transition {
                    kind: TurnKind::Completed,
                    response: self.script.completed.clone(),
                    state: next,
                    next_question: None,
                    form_completed: true,
                    generate_pdf: false,
                }
            }
        }
    }
}
