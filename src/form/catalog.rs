//! Question catalog: the ordered list of questions a conversation walks.

use std::collections::HashSet;

use super::model::FieldValue;

/// How raw answer text is turned into a form value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Trimmed text, accepted as-is (including the empty string).
    Identity,
    /// Tri-state yes/no parse; anything unrecognized is rejected.
    YesNo,
}

impl Coercion {
    /// Coerce an answer. `None` means the answer was rejected.
    pub fn apply(&self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Identity => Some(FieldValue::Text(raw.trim().to_string())),
            Self::YesNo => parse_yes_no(raw).map(FieldValue::Flag),
        }
    }
}

/// Yes wins over no: "yes, I know" is a yes even though it contains "no".
fn parse_yes_no(raw: &str) -> Option<bool> {
    let lower = raw.trim().to_lowercase();
    if lower.contains("yes") || lower == "y" {
        Some(true)
    } else if lower.contains("no") || lower == "n" {
        Some(false)
    } else {
        None
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSpec {
    pub id: String,
    pub prompt: String,
    /// Form-data key this question populates.
    pub field: String,
    pub coercion: Coercion,
}

impl QuestionSpec {
    pub fn new(id: &str, prompt: &str, field: &str, coercion: Coercion) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            field: field.to_string(),
            coercion,
        }
    }

    /// A free-text question whose id and field share a name.
    pub fn text(field: &str, prompt: &str) -> Self {
        Self::new(field, prompt, field, Coercion::Identity)
    }

    /// A yes/no question whose id and field share a name.
    pub fn yes_no(field: &str, prompt: &str) -> Self {
        Self::new(field, prompt, field, Coercion::YesNo)
    }
}

/// Reasons a catalog cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must contain at least one question")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(String),

    #[error("duplicate form field: {0}")]
    DuplicateField(String),
}

/// Immutable, ordered question list.
///
/// Catalog order is the only valid question order. Ids and fields are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<QuestionSpec>,
}

impl QuestionCatalog {
    pub fn new(questions: Vec<QuestionSpec>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut ids = HashSet::new();
        let mut fields = HashSet::new();
        for q in &questions {
            if !ids.insert(q.id.as_str()) {
                return Err(CatalogError::DuplicateId(q.id.clone()));
            }
            if !fields.insert(q.field.as_str()) {
                return Err(CatalogError::DuplicateField(q.field.clone()));
            }
        }
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&QuestionSpec> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.questions.iter()
    }

    /// The nine-question Indiana Appearance form used in eviction cases.
    pub fn appearance_form() -> Self {
        let questions = vec![
            QuestionSpec::text(
                fields::COUNTY,
                "Let's start with the court information. On the papers you received from the court, what County is listed at the very top?",
            ),
            QuestionSpec::text(
                fields::COURT,
                "And right below the County, what is the name of the Court (e.g., Superior Court, Small Claims Court)?",
            ),
            QuestionSpec::text(
                fields::CASE_NUMBER,
                "Great. Now, what is the Case Number? It should be labeled 'Cause No.' or 'Case No.'",
            ),
            QuestionSpec::text(
                fields::PLAINTIFF,
                "What is the full name of the person or company suing you (the Plaintiff)?",
            ),
            QuestionSpec::text(
                fields::DEFENDANT,
                "And what is your full legal name as the Defendant?",
            ),
            QuestionSpec::yes_no(
                fields::AGREE_TO_NOTIFY,
                "The court requires you to keep your contact information updated. Do you agree to notify the court if your address or phone number changes? (Please answer 'yes' or 'no')",
            ),
            QuestionSpec::text(
                fields::MAILING_ADDRESS,
                "To make sure the court can contact you, what is your current mailing address? (Include street, city, state, and zip code)",
            ),
            QuestionSpec::text(fields::PHONE, "What is your best contact phone number?"),
            QuestionSpec::text(fields::EMAIL, "And what is your email address?"),
        ];
        Self { questions }
    }
}

/// Field names of the Appearance form.
pub mod fields {
    pub const COUNTY: &str = "county";
    pub const COURT: &str = "court";
    pub const CASE_NUMBER: &str = "caseNumber";
    pub const PLAINTIFF: &str = "plaintiff";
    pub const DEFENDANT: &str = "defendant";
    pub const AGREE_TO_NOTIFY: &str = "agreeToNotify";
    pub const MAILING_ADDRESS: &str = "mailingAddress";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
}
