//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file, in-memory, and remote (sqld / Turso) databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::form::FormData;
use crate::store::migrations;
use crate::store::traits::{
    ConversationRecord, ConversationUpdate, Database, FormSubmissionRecord, MessageRecord, Sender,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Connect to a remote libSQL server and run migrations.
    pub async fn new_remote(url: &str, auth_token: &SecretString) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.expose_secret().to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to connect to {url}: {e}")))?;

        let backend = Self::from_database(db).await?;
        backend.init_schema().await?;
        info!(url = %url, "Remote database connected");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db).await?;
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        // SQLite leaves REFERENCES clauses unenforced unless asked, per connection.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn get_conversation_by_id(
        &self,
        id: &str,
    ) -> Result<Option<ConversationRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_conversation: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_conversation(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_conversation: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_form_data(s: &str) -> Result<FormData, DatabaseError> {
    serde_json::from_str(s).map_err(|e| DatabaseError::Serialization(format!("form_data: {e}")))
}

fn form_data_json(data: &FormData) -> Result<String, DatabaseError> {
    serde_json::to_string(data).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn opt_int(n: Option<i64>) -> libsql::Value {
    match n {
        Some(n) => libsql::Value::Integer(n),
        None => libsql::Value::Null,
    }
}

/// Map an INSERT failure on a child table of `conversations`.
fn child_insert_err(context: &str, conversation_id: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("FOREIGN KEY") {
        DatabaseError::NotFound {
            entity: "conversation".to_string(),
            id: conversation_id.to_string(),
        }
    } else {
        DatabaseError::Query(format!("{context}: {msg}"))
    }
}

fn row_err(context: &str) -> impl Fn(libsql::Error) -> DatabaseError + '_ {
    move |e| DatabaseError::Query(format!("{context} row parse: {e}"))
}

/// Column order matches CONVERSATION_COLUMNS.
fn row_to_conversation(row: &libsql::Row) -> Result<ConversationRecord, DatabaseError> {
    let err = row_err("conversation");
    let form_data: String = row.get(3).map_err(&err)?;
    let created: String = row.get(6).map_err(&err)?;
    let updated: String = row.get(7).map_err(&err)?;

    Ok(ConversationRecord {
        id: row.get(0).map_err(&err)?,
        session_id: row.get(1).map_err(&err)?,
        current_step: row.get::<i64>(2).map_err(&err)?.max(0) as usize,
        form_data: parse_form_data(&form_data)?,
        completed: row.get::<i64>(4).map_err(&err)? != 0,
        revision: row.get::<i64>(5).map_err(&err)?.max(0) as u64,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

/// Column order matches MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<MessageRecord, DatabaseError> {
    let err = row_err("message");
    let sender: String = row.get(3).map_err(&err)?;
    let created: String = row.get(5).map_err(&err)?;

    Ok(MessageRecord {
        id: row.get(0).map_err(&err)?,
        conversation_id: row.get(1).map_err(&err)?,
        text: row.get(2).map_err(&err)?,
        sender: sender.parse().map_err(DatabaseError::Serialization)?,
        order: row.get::<i64>(4).map_err(&err)?.max(0) as u32,
        created_at: parse_datetime(&created),
    })
}

/// Column order matches SUBMISSION_COLUMNS.
fn row_to_submission(row: &libsql::Row) -> Result<FormSubmissionRecord, DatabaseError> {
    let err = row_err("form_submission");
    let form_data: String = row.get(3).map_err(&err)?;
    let created: String = row.get(6).map_err(&err)?;

    Ok(FormSubmissionRecord {
        id: row.get(0).map_err(&err)?,
        conversation_id: row.get(1).map_err(&err)?,
        form_type: row.get(2).map_err(&err)?,
        form_data: parse_form_data(&form_data)?,
        pdf_generated: row.get::<i64>(4).map_err(&err)? != 0,
        pdf_url: row.get::<Option<String>>(5).map_err(&err)?,
        created_at: parse_datetime(&created),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const CONVERSATION_COLUMNS: &str =
    "id, session_id, current_step, form_data, completed, revision, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, message_text, sender, message_order, created_at";

const SUBMISSION_COLUMNS: &str =
    "id, conversation_id, form_type, form_data, pdf_generated, pdf_url, created_at";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Conversations ───────────────────────────────────────────────

    async fn create_conversation(
        &self,
        session_id: &str,
    ) -> Result<ConversationRecord, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO conversations (id, session_id, current_step, form_data, completed, revision, created_at, updated_at)
                 VALUES (?1, ?2, 0, '{}', 0, 0, ?3, ?3)",
                params![id.clone(), session_id, now_str],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    DatabaseError::Constraint(format!("session {session_id} already exists"))
                } else {
                    DatabaseError::Query(format!("create_conversation: {msg}"))
                }
            })?;

        debug!(conversation_id = %id, session_id = %session_id, "Conversation created");
        Ok(ConversationRecord {
            id,
            session_id: session_id.to_string(),
            current_step: 0,
            form_data: FormData::new(),
            completed: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_conversation_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE session_id = ?1"),
                params![session_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_conversation_by_session_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_conversation(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "get_conversation_by_session_id: {e}"
            ))),
        }
    }

    async fn update_conversation(
        &self,
        id: &str,
        update: &ConversationUpdate,
        expected_revision: u64,
    ) -> Result<ConversationRecord, DatabaseError> {
        let form_data = match &update.form_data {
            Some(data) => Some(form_data_json(data)?),
            None => None,
        };
        let now = Utc::now().to_rfc3339();

        let affected = self
            .conn()
            .execute(
                "UPDATE conversations SET
                    current_step = COALESCE(?1, current_step),
                    form_data = COALESCE(?2, form_data),
                    completed = COALESCE(?3, completed),
                    revision = revision + 1,
                    updated_at = ?4
                 WHERE id = ?5 AND revision = ?6",
                params![
                    opt_int(update.current_step.map(|s| s as i64)),
                    opt_text(form_data.as_deref()),
                    opt_int(update.completed.map(i64::from)),
                    now,
                    id,
                    expected_revision as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_conversation: {e}")))?;

        let record = self.get_conversation_by_id(id).await?;
        match (affected, record) {
            (0, None) => Err(DatabaseError::NotFound {
                entity: "conversation".to_string(),
                id: id.to_string(),
            }),
            (0, Some(_)) => Err(DatabaseError::Conflict {
                id: id.to_string(),
                expected: expected_revision,
            }),
            (_, Some(record)) => {
                debug!(conversation_id = %id, revision = record.revision, "Conversation updated");
                Ok(record)
            }
            (_, None) => Err(DatabaseError::NotFound {
                entity: "conversation".to_string(),
                id: id.to_string(),
            }),
        }
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn save_message(
        &self,
        conversation_id: &str,
        text: &str,
        sender: Sender,
        order: u32,
    ) -> Result<MessageRecord, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn()
            .execute(
                "INSERT INTO messages (id, conversation_id, message_text, sender, message_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.clone(),
                    conversation_id,
                    text,
                    sender.as_str(),
                    i64::from(order),
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE") {
                    DatabaseError::Constraint(format!(
                        "message order {order} already used in conversation {conversation_id}"
                    ))
                } else {
                    child_insert_err("save_message", conversation_id, e)
                }
            })?;

        debug!(conversation_id = %conversation_id, sender = %sender, order, "Message saved");
        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            sender,
            order,
            created_at: now,
        })
    }

    async fn get_messages_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1 ORDER BY message_order ASC"
                ),
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_messages_by_conversation_id: {e}")))?;

        let mut messages = Vec::new();
        loop {
            match rows.next().await {
                Ok(Some(row)) => messages.push(row_to_message(&row)?),
                Ok(None) => break,
                Err(e) => {
                    return Err(DatabaseError::Query(format!(
                        "get_messages_by_conversation_id: {e}"
                    )));
                }
            }
        }
        Ok(messages)
    }

    async fn count_messages(&self, conversation_id: &str) -> Result<u32, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("count_messages: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(row_err("count_messages"))?.max(0) as u32),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_messages: {e}"))),
        }
    }

    // ── Form submissions ────────────────────────────────────────────

    async fn create_form_submission(
        &self,
        conversation_id: &str,
        form_data: &FormData,
        form_type: &str,
    ) -> Result<FormSubmissionRecord, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.conn()
            .execute(
                "INSERT INTO form_submissions (id, conversation_id, form_type, form_data, pdf_generated, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    id.clone(),
                    conversation_id,
                    form_type,
                    form_data_json(form_data)?,
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| child_insert_err("create_form_submission", conversation_id, e))?;

        info!(submission_id = %id, conversation_id = %conversation_id, form_type, "Form submission created");
        Ok(FormSubmissionRecord {
            id,
            conversation_id: conversation_id.to_string(),
            form_type: form_type.to_string(),
            form_data: form_data.clone(),
            pdf_generated: false,
            pdf_url: None,
            created_at: now,
        })
    }

    async fn get_form_submission_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<FormSubmissionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM form_submissions
                     WHERE conversation_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_form_submission: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_submission(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_form_submission: {e}"))),
        }
    }

    async fn mark_pdf_generated(
        &self,
        submission_id: &str,
        pdf_url: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE form_submissions SET pdf_generated = 1, pdf_url = COALESCE(?1, pdf_url)
                 WHERE id = ?2",
                params![opt_text(pdf_url), submission_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("mark_pdf_generated: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "form_submission".to_string(),
                id: submission_id.to_string(),
            });
        }
        Ok(())
    }
}
