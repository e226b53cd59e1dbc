//! Session resolution. Maps an incoming turn onto a canonical conversation.
//!
//! A turn carries an optional client-held state and an optional session id.
//! Resolution decides which conversation the turn belongs to, creating one
//! when nothing usable was supplied.

use rand::Rng;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::form::ConversationState;
use crate::store::Database;

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a client session id: `session_<unix-millis>_<9 base36 chars>`.
pub fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{millis}_{suffix}")
}

/// Canonical state for one turn plus where the next message goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub state: ConversationState,
    /// Order number of the next message written to the conversation log.
    pub next_order: u32,
}

/// Resolve the conversation a turn applies to.
///
/// - No state and no session id: start a new conversation.
/// - Session id only: resume the stored conversation, or start a new one
///   when the id is unknown.
/// - A supplied state is used as-is. Its revision is checked when the turn
///   writes, so a stale state cannot overwrite newer progress.
pub async fn resolve(
    db: &dyn Database,
    supplied_state: Option<ConversationState>,
    supplied_session: Option<&str>,
) -> Result<Resolved, DatabaseError> {
    if let Some(state) = supplied_state {
        let next_order = match state.conversation_id.as_deref() {
            Some(id) => db.count_messages(id).await?,
            None => 0,
        };
        return Ok(Resolved { state, next_order });
    }

    if let Some(session_id) = supplied_session.filter(|s| !s.is_empty()) {
        if let Some(record) = db.get_conversation_by_session_id(session_id).await? {
            let next_order = db.count_messages(&record.id).await?;
            debug!(
                session_id = %session_id,
                step = record.current_step,
                next_order,
                "Resumed conversation"
            );
            return Ok(Resolved {
                state: record.to_state(),
                next_order,
            });
        }
        debug!(session_id = %session_id, "Unknown session, starting a new conversation");
    }

    start_new(db).await
}

async fn start_new(db: &dyn Database) -> Result<Resolved, DatabaseError> {
    let session_id = generate_session_id();
    let record = db.create_conversation(&session_id).await?;
    info!(session_id = %session_id, conversation_id = %record.id, "New conversation");
    Ok(Resolved {
        state: record.to_state(),
        next_order: 0,
    })
}
