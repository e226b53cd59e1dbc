//! Integration tests for the chat + document HTTP API.
//!
//! Each test spins up an Axum server on a random port backed by an in-memory
//! database and exercises the real REST contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use legal_navigator::chat::{
    AppState, DemoTurnProcessor, PersistentTurnProcessor, TurnProcessor, chat_routes,
};
use legal_navigator::config::ServerMode;
use legal_navigator::form::ConversationMachine;
use legal_navigator::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const ANSWERS: [&str; 9] = [
    "Marion",
    "Superior Court",
    "49D01-2024-EV-001234",
    "ABC Property Management",
    "John Smith",
    "yes",
    "123 Main St, Indianapolis, IN 46202",
    "(317) 555-0123",
    "john.smith@email.com",
];

/// Start a live-mode server on a random port, return (base url, db).
async fn start_server() -> (String, Arc<dyn Database>) {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let processor: Arc<dyn TurnProcessor> = Arc::new(PersistentTurnProcessor::new(
        Arc::clone(&db),
        ConversationMachine::appearance_form(),
    ));
    let state = AppState {
        processor,
        db: Some(Arc::clone(&db)),
        mode: ServerMode::Live,
    };
    (serve(state).await, db)
}

async fn start_demo_server() -> String {
    let processor: Arc<dyn TurnProcessor> =
        Arc::new(DemoTurnProcessor::new(ConversationMachine::appearance_form()));
    serve(AppState {
        processor,
        db: None,
        mode: ServerMode::Demo,
    })
    .await
}

async fn serve(state: AppState) -> String {
    let app = chat_routes(state, None);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

/// POST /api/chat and return (status, body).
async fn chat(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

/// Send `message` with the given state, expecting success.
async fn say(base: &str, message: &str, state: &Value) -> Value {
    let (status, body) = chat(
        base,
        json!({"message": message, "conversationState": state, "sessionId": state["sessionId"]}),
    )
    .await;
    assert_eq!(status, 200, "unexpected body: {body}");
    body
}

/// Greet, then answer every question. Returns the final reply.
async fn complete_form(base: &str) -> Value {
    let (_, greeting) = chat(base, json!({})).await;
    let mut state = greeting["conversationState"].clone();
    let mut reply = Value::Null;
    for answer in ANSWERS {
        reply = say(base, answer, &state).await;
        state = reply["conversationState"].clone();
    }
    reply
}

// ── Chat ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_visitor_gets_greeting() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (status, body) = chat(&base, json!({})).await;

        assert_eq!(status, 200);
        assert!(body["response"].as_str().unwrap().starts_with("Hello!"));
        assert!(
            body["nextQuestion"]
                .as_str()
                .unwrap()
                .contains("what County is listed")
        );
        let state = &body["conversationState"];
        assert_eq!(state["currentStep"], 0);
        assert_eq!(state["completed"], false);
        assert_eq!(state["formData"], json!({}));
        assert!(state["sessionId"].as_str().unwrap().starts_with("session_"));
        assert!(state["conversationId"].is_string());
        assert!(body.get("formCompleted").is_none());
        assert!(body.get("generatePdf").is_none());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn first_answer_advances() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let body = say(&base, "Marion", &greeting["conversationState"]).await;

        assert_eq!(body["conversationState"]["currentStep"], 1);
        assert_eq!(body["conversationState"]["formData"]["county"], "Marion");
        assert!(
            body["response"]
                .as_str()
                .unwrap()
                .starts_with("Thank you! And right below the County")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_yes_no_reprompts() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let mut state = greeting["conversationState"].clone();
        for answer in &ANSWERS[..5] {
            state = say(&base, answer, &state).await["conversationState"].clone();
        }

        let body = say(&base, "maybe", &state).await;
        assert_eq!(body["conversationState"], state);
        assert!(
            body["response"]
                .as_str()
                .unwrap()
                .starts_with("Please answer 'yes' or 'no'")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_walk_completes_and_confirms() {
    timeout(TEST_TIMEOUT, async {
        let (base, db) = start_server().await;
        let last = complete_form(&base).await;

        assert_eq!(last["formCompleted"], true);
        let state = last["conversationState"].clone();
        assert_eq!(state["completed"], true);
        assert_eq!(state["currentStep"], 9);
        assert_eq!(state["formData"]["agreeToNotify"], true);
        assert_eq!(state["formData"]["email"], "john.smith@email.com");

        let confirm = say(&base, "yes", &state).await;
        assert_eq!(confirm["generatePdf"], true);
        assert_eq!(confirm["conversationState"], state);

        let conversation_id = state["conversationId"].as_str().unwrap();
        let submission = db
            .get_form_submission_by_conversation_id(conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(submission.form_data.len(), 9);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn completed_conversation_ignores_other_text() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let state = complete_form(&base).await["conversationState"].clone();

        let body = say(&base, "not right now", &state).await;
        assert!(body["response"].as_str().unwrap().starts_with("I'm sorry"));
        assert!(body.get("generatePdf").is_none());
        assert_eq!(body["conversationState"], state);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn resume_by_session_id() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let state = say(&base, "Marion", &greeting["conversationState"]).await["conversationState"]
            .clone();

        let (status, body) = chat(
            &base,
            json!({"message": "Superior Court", "sessionId": state["sessionId"]}),
        )
        .await;
        assert_eq!(status, 200);
        let resumed = &body["conversationState"];
        assert_eq!(resumed["conversationId"], state["conversationId"]);
        assert_eq!(resumed["currentStep"], 2);
        assert_eq!(resumed["formData"]["court"], "Superior Court");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_session_starts_over() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (status, body) = chat(&base, json!({"sessionId": "session_0_unknown00"})).await;

        assert_eq!(status, 200);
        assert!(body["response"].as_str().unwrap().starts_with("Hello!"));
        assert_eq!(body["conversationState"]["currentStep"], 0);
        assert_ne!(body["conversationState"]["sessionId"], "session_0_unknown00");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stale_state_is_a_conflict() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let stale = greeting["conversationState"].clone();

        say(&base, "Marion", &stale).await;
        let (status, body) = chat(
            &base,
            json!({"message": "Lake", "conversationState": stale, "sessionId": stale["sessionId"]}),
        )
        .await;
        assert_eq!(status, 409);
        assert_eq!(body["error"], "Conversation state is out of date");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn confirmation_for_unknown_conversation_fails() {
    timeout(TEST_TIMEOUT, async {
        let (base, db) = start_server().await;
        let forged = json!({
            "currentStep": 9,
            "formData": {"county": "Marion"},
            "completed": true,
            "conversationId": "bogus",
        });
        let (status, body) = chat(&base, json!({"message": "yes", "conversationState": forged})).await;
        assert_eq!(status, 500);
        assert!(body.get("generatePdf").is_none());
        assert!(db.get_messages_by_conversation_id("bogus").await.unwrap().is_empty());
        assert!(
            db.get_form_submission_by_conversation_id("bogus")
                .await
                .unwrap()
                .is_none()
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_body_is_internal_error() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/chat"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Internal server error");
    })
    .await
    .expect("test timed out");
}

// ── History & submissions ────────────────────────────────────────────

#[tokio::test]
async fn history_returns_transcript_in_order() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let state = say(&base, "Marion", &greeting["conversationState"]).await["conversationState"]
            .clone();
        let session_id = state["sessionId"].as_str().unwrap();

        let resp = reqwest::get(format!("{base}/api/chat/history?sessionId={session_id}"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["conversationId"], state["conversationId"]);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        let senders: Vec<&str> = messages
            .iter()
            .map(|m| m["sender"].as_str().unwrap())
            .collect();
        assert_eq!(senders, ["ai", "user", "ai"]);
        assert_eq!(messages[1]["text"], "Marion");
        assert_eq!(messages[2]["order"], 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn history_for_unknown_session_is_404() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let resp = reqwest::get(format!("{base}/api/chat/history?sessionId=session_0_nothing"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn submission_lookup() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let state = complete_form(&base).await["conversationState"].clone();
        let conversation_id = state["conversationId"].as_str().unwrap();

        let resp = reqwest::get(format!("{base}/api/submissions/{conversation_id}"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);

        say(&base, "yes", &state).await;
        let resp = reqwest::get(format!("{base}/api/submissions/{conversation_id}"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["formType"], "appearance_form");
        assert_eq!(body["pdfGenerated"], false);
        assert_eq!(body["formData"]["county"], "Marion");
    })
    .await
    .expect("test timed out");
}

// ── Documents ────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_pdf_requires_form_data() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/generate-pdf"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Form data is required");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn generate_pdf_returns_document_and_marks_submission() {
    timeout(TEST_TIMEOUT, async {
        let (base, db) = start_server().await;
        let state = complete_form(&base).await["conversationState"].clone();
        say(&base, "yes", &state).await;

        let resp = reqwest::Client::new()
            .post(format!("{base}/api/generate-pdf"))
            .json(&json!({
                "formData": state["formData"],
                "conversationId": state["conversationId"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let headers = resp.headers().clone();
        assert_eq!(headers["content-type"], "application/pdf");
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"Appearance_Form.pdf\""
        );
        let bytes = resp.bytes().await.unwrap();
        assert_eq!(
            headers["content-length"].to_str().unwrap(),
            bytes.len().to_string()
        );
        assert!(bytes.starts_with(b"%PDF-"));

        let submission = db
            .get_form_submission_by_conversation_id(state["conversationId"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(submission.pdf_generated);
    })
    .await
    .expect("test timed out");
}

// ── Health & demo ────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_mode() {
    timeout(TEST_TIMEOUT, async {
        let (base, _db) = start_server().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mode"], "live");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn demo_mode_walks_with_sample_answers() {
    timeout(TEST_TIMEOUT, async {
        let base = start_demo_server().await;
        let (_, greeting) = chat(&base, json!({})).await;
        let state = &greeting["conversationState"];
        assert!(state["sessionId"].as_str().unwrap().starts_with("session_"));
        assert!(state.get("conversationId").is_none());

        let body = say(&base, "anything at all", state).await;
        assert_eq!(body["conversationState"]["formData"]["county"], "Marion");

        let resp = reqwest::get(format!("{base}/api/chat/history?sessionId=whatever"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    })
    .await
    .expect("test timed out");
}
