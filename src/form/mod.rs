//! Guided form filling: question catalog, collected data, and the
//! conversation state machine that walks a user through the questions.

pub mod catalog;
pub mod machine;
pub mod model;

pub use catalog::{CatalogError, Coercion, QuestionCatalog, QuestionSpec};
pub use machine::{ConversationMachine, Script, Transition, TurnKind};
pub use model::{ConversationState, FieldValue, FormData};
