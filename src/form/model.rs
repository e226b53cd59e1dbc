//! Form data and conversation state models.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A single collected value: free text or a yes/no flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Text(_) => None,
        }
    }
}

/// Collected answers keyed by form field name.
///
/// Serializes as a flat JSON object (`{"county": "Marion", "agreeToNotify": true}`).
/// `null` values in incoming JSON are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, FieldValue>);

impl<'de> Deserialize<'de> for FormData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<FieldValue>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        ))
    }
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Text value of `field`, if present and textual.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Flag value of `field`, if present and boolean.
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_flag)
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, field: &str, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }
}

/// Canonical state of one conversation, exchanged with the client every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Index into the question catalog; equals the number of answered questions.
    pub current_step: usize,
    #[serde(default)]
    pub form_data: FormData,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Snapshot revision; bumped by one on every persisted update.
    #[serde(default)]
    pub revision: u64,
}

impl ConversationState {
    /// A brand-new conversation at step 0.
    pub fn fresh(session_id: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            current_step: 0,
            form_data: FormData::new(),
            completed: false,
            conversation_id,
            session_id: Some(session_id.into()),
            revision: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_data_serializes_flat() {
        let data = FormData::new()
            .with("county", FieldValue::Text("Marion".to_string()))
            .with("agreeToNotify", FieldValue::Flag(true));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"county": "Marion", "agreeToNotify": true})
        );
    }

    #[test]
    fn form_data_drops_nulls() {
        let data: FormData =
            serde_json::from_str(r#"{"county": "Marion", "phone": null, "agreeToNotify": false}"#)
                .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.text("county"), Some("Marion"));
        assert_eq!(data.flag("agreeToNotify"), Some(false));
        assert!(data.get("phone").is_none());
    }

    #[test]
    fn typed_accessors_do_not_cross() {
        let data = FormData::new()
            .with("a", FieldValue::Text("true".to_string()))
            .with("b", FieldValue::Flag(true));
        assert_eq!(data.flag("a"), None);
        assert_eq!(data.text("b"), None);
    }

    #[test]
    fn state_uses_camel_case_and_defaults() {
        let state: ConversationState = serde_json::from_str(
            r#"{"currentStep": 2, "formData": {"county": "Lake"}, "completed": false, "sessionId": "s1"}"#,
        )
        .unwrap();
        assert_eq!(state.current_step, 2);
        assert_eq!(state.revision, 0);
        assert!(state.conversation_id.is_none());
        assert_eq!(state.session_id.as_deref(), Some("s1"));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentStep"], 2);
        assert_eq!(json["formData"]["county"], "Lake");
        assert!(json.get("conversationId").is_none());
    }

    #[test]
    fn fresh_state() {
        let state = ConversationState::fresh("session_1_abc", Some("conv-1".to_string()));
        assert_eq!(state.current_step, 0);
        assert!(state.form_data.is_empty());
        assert!(!state.completed);
        assert_eq!(state.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(state.revision, 0);
    }
}
