//! Persistence layer — libSQL-backed storage for conversations, messages,
//! and form submissions.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{
    APPEARANCE_FORM_TYPE, ConversationRecord, ConversationUpdate, Database, FormSubmissionRecord,
    MessageRecord, Sender,
};
