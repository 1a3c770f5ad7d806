//! Validation verdict model.

use crate::answer::AnswerValue;
use serde::{Deserialize, Serialize};

/// The structured outcome of interpreting one LLM completion against one
/// question/answer pair.
///
/// A verdict is ephemeral: it is produced by the response interpreter,
/// merged into answer state by the orchestrator, then discarded. The
/// question prompt and answer value that were sent for validation are
/// echoed back for traceability, and the echoed value doubles as the
/// staleness check at merge time: a verdict whose echoed value no longer
/// matches the answer's current value must be dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Id of the question the verdict applies to.
    pub question_id: String,
    /// Resolved validity; `None` when the response could not be interpreted
    /// at all (treated as a failed validation by the merge step).
    pub valid: Option<bool>,
    /// Follow-up question text, present when the answer was judged
    /// insufficient and the model produced a probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    /// Echo of the question prompt the completion was requested for.
    pub question_prompt: String,
    /// Echo of the answer value that was sent for validation.
    pub answer_value: AnswerValue,
    /// True when the free-text heuristic (the last-resort dialect) produced
    /// this verdict. Informational only; never affects validity.
    #[serde(default)]
    pub heuristic_fallback: bool,
}

impl Verdict {
    /// Whether this verdict asks for a follow-up question.
    pub fn is_probe(&self) -> bool {
        self.valid == Some(false)
            && self
                .follow_up
                .as_ref()
                .is_some_and(|text| !text.trim().is_empty())
    }
}
