//! Prompt template rendering.
//!
//! Templates are authored outside this crate (the prompt editor persists
//! them); the core receives the resolved two-part text and performs the
//! placeholder substitution itself.

use serde::{Deserialize, Serialize};

/// Placeholder for the question prompt in the user-message template.
pub const QUESTION_PLACEHOLDER: &str = "{question}";
/// Placeholder for the sibling single-choice answer, when one exists.
pub const SCORE_PLACEHOLDER: &str = "{score}";
/// Placeholder for the respondent's answer text.
pub const ANSWER_PLACEHOLDER: &str = "{answer}";

/// A two-part prompt template: system instruction plus user-message
/// template with `{question}`, `{score}` and `{answer}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system_instruction: String,
    pub user_template: String,
}

/// A rendered prompt pair, ready for the completion agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    /// Creates a template from its two parts.
    pub fn new(system_instruction: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_template: user_template.into(),
        }
    }

    /// Substitutes the placeholders and returns the rendered pair.
    ///
    /// A missing score substitutes as the empty string; a template that
    /// omits a placeholder is fine, substitution only touches placeholders
    /// that actually occur.
    pub fn render(&self, question: &str, answer: &str, score: Option<&str>) -> RenderedPrompt {
        let user = self
            .user_template
            .replace(QUESTION_PLACEHOLDER, question)
            .replace(ANSWER_PLACEHOLDER, answer)
            .replace(SCORE_PLACEHOLDER, score.unwrap_or(""));
        RenderedPrompt {
            system: self.system_instruction.clone(),
            user,
        }
    }
}

impl Default for PromptTemplate {
    /// The built-in probing template, matching the response dialects the
    /// interpreter understands.
    fn default() -> Self {
        Self {
            system_instruction: "You review survey answers for substance. \
                If the answer gives enough concrete detail to be useful, reply with \
                the single token NO_PROBE. Otherwise reply with a JSON object \
                {\"action\": \"probe\", \"text\": \"<one short follow-up question>\"}."
                .to_string(),
            user_template: "Question: {question}\nRating given: {score}\nAnswer: {answer}"
                .to_string(),
        }
    }
}
