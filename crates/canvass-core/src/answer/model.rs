//! Answer domain model.

use serde::{Deserialize, Serialize};

/// A respondent's answer value.
///
/// Text and single-choice questions carry a single string; multiple-choice
/// questions carry a string set. Serialized untagged so JSON payloads stay
/// the plain string / string-array shape the form layer produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// A single string value (text and single-choice questions).
    Text(String),
    /// A set of selected options (multiple-choice questions).
    Selections(Vec<String>),
}

impl AnswerValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a multiple-choice selection set.
    pub fn selections(values: Vec<String>) -> Self {
        Self::Selections(values)
    }

    /// Whether this value is empty for submission purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            Self::Selections(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }

    /// Flattens the value into the text form used for prompt rendering.
    pub fn as_prompt_text(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Selections(values) => values.join(", "),
        }
    }
}

/// The validation lifecycle state of one answer.
///
/// `Unvalidated → Validating → {Valid, Invalid, Errored}`; editing the
/// answer after a terminal verdict transitions back to `Unvalidated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No verdict yet, or the value changed after a prior verdict.
    Unvalidated,
    /// A validation request is in flight.
    Validating,
    /// The LLM judged the answer sufficient.
    Valid,
    /// The LLM judged the answer insufficient; a follow-up is attached.
    Invalid,
    /// The validation call failed (transport error or timeout).
    Errored,
}

impl ValidationStatus {
    /// Whether a verdict or failure has been reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Valid | Self::Invalid | Self::Errored)
    }

    /// Whether a validation request is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Validating)
    }
}

/// One question's answer with its validation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Id of the question this answers.
    pub question_id: String,
    /// The respondent's current value.
    pub value: AnswerValue,
    /// Validation lifecycle state.
    pub status: ValidationStatus,
    /// Follow-up question text, attached when `status` is `Invalid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

impl Answer {
    /// Creates a fresh, unvalidated answer.
    pub fn new(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            value,
            status: ValidationStatus::Unvalidated,
            follow_up: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_ignores_whitespace() {
        assert!(AnswerValue::text("   ").is_empty());
        assert!(!AnswerValue::text("ok").is_empty());
        assert!(AnswerValue::selections(vec![]).is_empty());
        assert!(AnswerValue::selections(vec![" ".into()]).is_empty());
        assert!(!AnswerValue::selections(vec!["a".into()]).is_empty());
    }

    #[test]
    fn prompt_text_joins_selections() {
        let value = AnswerValue::selections(vec!["red".into(), "blue".into()]);
        assert_eq!(value.as_prompt_text(), "red, blue");
    }

    #[test]
    fn untagged_serialization_shapes() {
        let text = serde_json::to_value(AnswerValue::text("hello")).unwrap();
        assert_eq!(text, serde_json::json!("hello"));

        let set = serde_json::to_value(AnswerValue::selections(vec!["a".into()])).unwrap();
        assert_eq!(set, serde_json::json!(["a"]));
    }
}
