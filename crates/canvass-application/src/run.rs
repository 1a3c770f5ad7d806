//! Survey run state.
//!
//! A `SurveyRun` owns the mutable state of one respondent's pass through a
//! survey: the question sequence (which grows as follow-ups are injected)
//! and the answer sheet. It also evaluates the submission gate: the rule
//! deciding whether the run may be submitted in its current state.

use canvass_core::answer::{AnswerSheet, AnswerValue, ValidationStatus};
use canvass_core::error::{CanvassError, Result};
use canvass_core::question::{Injection, Question, QuestionKind, SurveyConfig, inject_follow_up};
use canvass_core::verdict::Verdict;
use serde::{Deserialize, Serialize};

/// One reason submission is currently not permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionBlocker {
    /// A validation request for this question is still in flight.
    ValidationInFlight { question_id: String },
    /// An injected follow-up question has not been answered yet.
    UnansweredFollowUp { question_id: String },
    /// A required question has no non-empty answer.
    RequiredUnanswered { question_id: String },
    /// The question's validation call failed (batch policy).
    ValidationFailed { question_id: String },
    /// An eligible answer has not been validated yet (batch policy).
    AwaitingValidation { question_id: String },
}

/// Result of evaluating the submission gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCheck {
    pub blockers: Vec<SubmissionBlocker>,
}

impl SubmissionCheck {
    /// Whether submission is permitted.
    pub fn is_allowed(&self) -> bool {
        self.blockers.is_empty()
    }
}

/// The mutable state of one respondent's pass through a survey.
pub struct SurveyRun {
    questions: Vec<Question>,
    answers: AnswerSheet,
}

impl SurveyRun {
    /// Creates a run from a validated survey config.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the question list is malformed
    /// (duplicate ids, reserved markers, inconsistent options).
    pub fn from_config(config: SurveyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            questions: config.questions,
            answers: AnswerSheet::new(),
        })
    }

    /// The current question sequence, including injected follow-ups.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Looks up a question by id.
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions
            .iter()
            .find(|question| question.id == question_id)
    }

    /// The answer sheet (read-only).
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    /// The answer sheet (mutable, for the orchestrator's merge step).
    pub fn answers_mut(&mut self) -> &mut AnswerSheet {
        &mut self.answers
    }

    /// Records respondent input for a question.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the question id is not in the sequence.
    pub fn record_answer(&mut self, question_id: &str, value: AnswerValue) -> Result<()> {
        if self.question(question_id).is_none() {
            return Err(CanvassError::not_found("question", question_id));
        }
        self.answers.record(question_id, value);
        Ok(())
    }

    /// Questions currently due for probing: eligible, non-empty answer,
    /// still unvalidated. Returned as clones so the caller can release the
    /// run lock while the completions are in flight.
    pub fn probe_candidates(&self) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|question| {
                question.is_probe_candidate()
                    && self.answers.is_answered(&question.id)
                    && self.answers.status_of(&question.id) == Some(ValidationStatus::Unvalidated)
            })
            .cloned()
            .collect()
    }

    /// The auxiliary scoring context: the current answer of the first
    /// single-choice question, when one exists and has been answered.
    pub fn score_context(&self) -> Option<String> {
        self.questions
            .iter()
            .filter(|question| question.kind == QuestionKind::SingleChoice)
            .find_map(|question| {
                self.answers
                    .value_of(&question.id)
                    .filter(|value| !value.is_empty())
                    .map(AnswerValue::as_prompt_text)
            })
    }

    /// Injects a probe verdict's follow-up question after its parent.
    pub fn inject_follow_up(&mut self, verdict: &Verdict) -> Injection {
        inject_follow_up(&mut self.questions, verdict)
    }

    /// Evaluates the submission gate.
    ///
    /// Submission is permitted only when no answer is mid-flight, every
    /// injected follow-up and every required question has a non-empty
    /// answer, and, under batch policy, no eligible answer is left
    /// unvalidated or errored. Verdicts are merged synchronously under the
    /// run lock, so there is never an applied-but-pending follow-up at
    /// evaluation time.
    pub fn submission_check(&self, batch_policy: bool) -> SubmissionCheck {
        let mut blockers = Vec::new();
        for question in &self.questions {
            let answered = self.answers.is_answered(&question.id);
            let status = self.answers.status_of(&question.id);

            if status == Some(ValidationStatus::Validating) {
                blockers.push(SubmissionBlocker::ValidationInFlight {
                    question_id: question.id.clone(),
                });
            }
            if question.is_derived() && !answered {
                blockers.push(SubmissionBlocker::UnansweredFollowUp {
                    question_id: question.id.clone(),
                });
            } else if question.required && !question.is_derived() && !answered {
                blockers.push(SubmissionBlocker::RequiredUnanswered {
                    question_id: question.id.clone(),
                });
            }
            if batch_policy {
                if status == Some(ValidationStatus::Errored) {
                    blockers.push(SubmissionBlocker::ValidationFailed {
                        question_id: question.id.clone(),
                    });
                }
                if question.is_probe_candidate()
                    && answered
                    && status == Some(ValidationStatus::Unvalidated)
                {
                    blockers.push(SubmissionBlocker::AwaitingValidation {
                        question_id: question.id.clone(),
                    });
                }
            }
        }
        SubmissionCheck { blockers }
    }
}
