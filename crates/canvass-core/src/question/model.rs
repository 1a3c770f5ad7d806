//! Question domain model.
//!
//! This module contains the core `Question` entity and the survey
//! configuration container the operator-facing editors produce.

use crate::error::{CanvassError, Result};
use serde::{Deserialize, Serialize};

/// Marker embedded in the id of every derived (follow-up) question.
///
/// A derived question's id is always `<parent id><marker><suffix>`, which
/// makes the parent recoverable from the id alone and keeps derived ids
/// unique within a run.
pub const FOLLOW_UP_MARKER: &str = "::followup::";

/// The kind of input a question collects from the respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Open text input.
    Text,
    /// Exactly one option from the option list.
    SingleChoice,
    /// Any subset of the option list.
    MultipleChoice,
}

impl QuestionKind {
    /// Whether this kind carries an option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }
}

/// A single survey question.
///
/// Questions are identified by a string id unique within a config. Questions
/// synthesized from a follow-up verdict (derived questions) carry
/// [`FOLLOW_UP_MARKER`] in their id; they are always required and never
/// eligible for LLM probing themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question identifier.
    pub id: String,
    /// The prompt text shown to the respondent.
    pub prompt: String,
    /// Input kind.
    pub kind: QuestionKind,
    /// Options, present iff `kind` is a choice kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Whether the respondent must answer before submission.
    #[serde(default)]
    pub required: bool,
    /// Whether this question's answers may be sent to the LLM for probing.
    /// Only meaningful on text questions; defaults to true.
    #[serde(default = "default_probe_eligible")]
    pub probe_eligible: bool,
}

fn default_probe_eligible() -> bool {
    true
}

impl Question {
    /// Creates a plain text question with default flags.
    pub fn text(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind: QuestionKind::Text,
            options: Vec::new(),
            required: false,
            probe_eligible: true,
        }
    }

    /// Creates a single-choice question over the given options.
    pub fn single_choice(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            kind: QuestionKind::SingleChoice,
            options,
            required: false,
            probe_eligible: false,
        }
    }

    /// Marks the question as required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Overrides probing eligibility.
    pub fn with_probe_eligible(mut self, probe_eligible: bool) -> Self {
        self.probe_eligible = probe_eligible;
        self
    }

    /// Whether this question was synthesized from a follow-up verdict.
    pub fn is_derived(&self) -> bool {
        self.id.contains(FOLLOW_UP_MARKER)
    }

    /// The parent question id, when this is a derived question.
    pub fn parent_id(&self) -> Option<&str> {
        if self.is_derived() {
            self.id.split(FOLLOW_UP_MARKER).next()
        } else {
            None
        }
    }

    /// Whether this question's answers are sent to the LLM for probing.
    ///
    /// Three conditions, all required: text kind, eligibility flag not
    /// explicitly false, and not itself a derived question.
    pub fn is_probe_candidate(&self) -> bool {
        self.kind == QuestionKind::Text && self.probe_eligible && !self.is_derived()
    }
}

/// The ordered question list a survey run is created from.
///
/// This is the already-loaded form; reading and writing config files belongs
/// to the persistence collaborator outside this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "question", default)]
    pub questions: Vec<Question>,
}

impl SurveyConfig {
    /// Creates a config from an ordered question list.
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Validates the question list.
    ///
    /// Rejected at this boundary: empty ids, duplicate ids, ids carrying the
    /// follow-up marker (reserved for synthesized questions), and option
    /// lists inconsistent with the question kind.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for question in &self.questions {
            if question.id.trim().is_empty() {
                return Err(CanvassError::config("question id must not be empty"));
            }
            if question.id.contains(FOLLOW_UP_MARKER) {
                return Err(CanvassError::config(format!(
                    "question id '{}' uses the reserved follow-up marker",
                    question.id
                )));
            }
            if !seen.insert(question.id.as_str()) {
                return Err(CanvassError::config(format!(
                    "duplicate question id '{}'",
                    question.id
                )));
            }
            if question.kind.is_choice() && question.options.is_empty() {
                return Err(CanvassError::config(format!(
                    "choice question '{}' has no options",
                    question.id
                )));
            }
            if !question.kind.is_choice() && !question.options.is_empty() {
                return Err(CanvassError::config(format!(
                    "text question '{}' must not carry options",
                    question.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_id_round_trip() {
        let derived = Question {
            id: format!("q1{}1", FOLLOW_UP_MARKER),
            prompt: "Why?".to_string(),
            kind: QuestionKind::Text,
            options: Vec::new(),
            required: true,
            probe_eligible: false,
        };
        assert!(derived.is_derived());
        assert_eq!(derived.parent_id(), Some("q1"));
        assert!(!derived.is_probe_candidate());

        let plain = Question::text("q1", "Tell us more");
        assert!(!plain.is_derived());
        assert_eq!(plain.parent_id(), None);
        assert!(plain.is_probe_candidate());
    }

    #[test]
    fn probe_candidate_requires_text_kind() {
        let choice = Question::single_choice("q2", "Pick one", vec!["a".into(), "b".into()]);
        assert!(!choice.is_probe_candidate());

        let opted_out = Question::text("q3", "Anything else?").with_probe_eligible(false);
        assert!(!opted_out.is_probe_candidate());
    }

    #[test]
    fn config_rejects_duplicate_ids() {
        let config = SurveyConfig::new(vec![
            Question::text("q1", "First"),
            Question::text("q1", "Second"),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn config_rejects_reserved_marker() {
        let config = SurveyConfig::new(vec![Question::text(
            format!("q1{}1", FOLLOW_UP_MARKER),
            "Sneaky",
        )]);
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn config_rejects_inconsistent_options() {
        let config = SurveyConfig::new(vec![Question::single_choice("q1", "Pick", Vec::new())]);
        assert!(config.validate().is_err());

        let mut text = Question::text("q2", "Free form");
        text.options = vec!["stray".into()];
        let config = SurveyConfig::new(vec![text]);
        assert!(config.validate().is_err());
    }
}
