//! Mutable answer state for one survey run.

use super::model::{Answer, AnswerValue, ValidationStatus};
use crate::verdict::Verdict;
use std::collections::HashMap;

/// Outcome of merging a verdict into the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictApplication {
    /// The verdict was applied; the answer now has the given status.
    Applied(ValidationStatus),
    /// The answer's value changed after the validation request was issued;
    /// the verdict was discarded without touching the newer state.
    DiscardedStale,
    /// No answer exists for the verdict's question id.
    NoAnswer,
}

/// All answers of one survey run, keyed by question id.
///
/// The sheet owns every answer state transition. Verdict merging goes
/// through [`AnswerSheet::apply_verdict`], which performs the staleness
/// check against the value echoed on the verdict. In-flight completions
/// are never cancelled, so a stale verdict arriving after an edit must be
/// dropped here rather than overwrite newer input.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    entries: HashMap<String, Answer>,
}

impl AnswerSheet {
    /// Creates an empty sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records respondent input for a question.
    ///
    /// Overwrites any previous value. When the value actually changes, the
    /// validation status resets to `Unvalidated` and any attached follow-up
    /// text is cleared; re-entering the identical value keeps the existing
    /// status (including an in-flight `Validating`).
    pub fn record(&mut self, question_id: impl Into<String>, value: AnswerValue) {
        let question_id = question_id.into();
        match self.entries.get_mut(&question_id) {
            Some(existing) if existing.value == value => {}
            Some(existing) => {
                existing.value = value;
                existing.status = ValidationStatus::Unvalidated;
                existing.follow_up = None;
            }
            None => {
                self.entries
                    .insert(question_id.clone(), Answer::new(question_id, value));
            }
        }
    }

    /// Returns the answer for a question, if any input was recorded.
    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.entries.get(question_id)
    }

    /// Returns the current value for a question.
    pub fn value_of(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entries.get(question_id).map(|answer| &answer.value)
    }

    /// Returns the validation status for a question.
    pub fn status_of(&self, question_id: &str) -> Option<ValidationStatus> {
        self.entries.get(question_id).map(|answer| answer.status)
    }

    /// Whether the question has a non-empty answer.
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.entries
            .get(question_id)
            .is_some_and(|answer| !answer.value.is_empty())
    }

    /// Iterates over all recorded answers.
    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.entries.values()
    }

    /// Marks a question's answer as in flight and returns a snapshot of the
    /// value being sent for validation.
    ///
    /// Returns `None` (and leaves the state untouched) when no non-empty
    /// answer exists: there is nothing to validate.
    pub fn begin_validation(&mut self, question_id: &str) -> Option<AnswerValue> {
        let answer = self.entries.get_mut(question_id)?;
        if answer.value.is_empty() {
            return None;
        }
        answer.status = ValidationStatus::Validating;
        Some(answer.value.clone())
    }

    /// Rolls an in-flight answer back to `Unvalidated`.
    ///
    /// Used when the request was never issued (throttling gate rejection).
    /// No-op when the value changed in the meantime or the answer is no
    /// longer in flight.
    pub fn revert_validation(&mut self, question_id: &str, sent: &AnswerValue) {
        if let Some(answer) = self.entries.get_mut(question_id) {
            if answer.status == ValidationStatus::Validating && answer.value == *sent {
                answer.status = ValidationStatus::Unvalidated;
            }
        }
    }

    /// Marks an in-flight answer as `Errored` after a failed completion call.
    ///
    /// Returns false (discarding the failure) when the value changed while
    /// the call was in flight; the newer input owns the state now.
    pub fn mark_errored(&mut self, question_id: &str, sent: &AnswerValue) -> bool {
        match self.entries.get_mut(question_id) {
            Some(answer) if answer.status == ValidationStatus::Validating && answer.value == *sent => {
                answer.status = ValidationStatus::Errored;
                true
            }
            _ => false,
        }
    }

    /// Merges a verdict into the sheet.
    ///
    /// The verdict's echoed answer value must still equal the answer's
    /// current value, otherwise the verdict is stale and dropped. An
    /// uninterpretable verdict (`valid == None`) counts as a failed
    /// validation.
    pub fn apply_verdict(&mut self, verdict: &Verdict) -> VerdictApplication {
        let Some(answer) = self.entries.get_mut(&verdict.question_id) else {
            return VerdictApplication::NoAnswer;
        };
        if answer.value != verdict.answer_value {
            return VerdictApplication::DiscardedStale;
        }
        let status = match verdict.valid {
            Some(true) => {
                answer.follow_up = None;
                ValidationStatus::Valid
            }
            Some(false) => {
                answer.follow_up = verdict.follow_up.clone();
                ValidationStatus::Invalid
            }
            None => ValidationStatus::Errored,
        };
        answer.status = status;
        VerdictApplication::Applied(status)
    }
}
