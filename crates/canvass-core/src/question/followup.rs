//! Follow-up question injection.
//!
//! When a probe verdict comes back for a parent question, a derived
//! question carrying the follow-up text is inserted directly after the
//! parent in the question sequence. Injection is idempotent: merging the
//! same verdict twice never produces two derived questions.

use super::model::{FOLLOW_UP_MARKER, Question, QuestionKind};
use crate::verdict::Verdict;

/// Outcome of a follow-up injection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// A new derived question was inserted after its parent.
    Inserted { question_id: String },
    /// An equivalent derived question already existed; nothing was inserted.
    AlreadyPresent { question_id: String },
    /// The verdict carried no usable follow-up, or its parent question is
    /// not in the sequence.
    NotApplicable,
}

impl Injection {
    /// The derived question id, when one exists after this injection.
    pub fn question_id(&self) -> Option<&str> {
        match self {
            Injection::Inserted { question_id } | Injection::AlreadyPresent { question_id } => {
                Some(question_id)
            }
            Injection::NotApplicable => None,
        }
    }
}

/// Injects the follow-up question of a probe verdict into the sequence.
///
/// The derived question is placed at `parent index + 1`, is always required,
/// and is never itself eligible for probing. Its id is the parent id, the
/// follow-up marker and a per-parent counter suffix. If a derived question
/// with the same parent and the same prompt text already exists, the
/// sequence is left untouched.
pub fn inject_follow_up(questions: &mut Vec<Question>, verdict: &Verdict) -> Injection {
    let Some(follow_up) = verdict.follow_up.as_deref().map(str::trim) else {
        return Injection::NotApplicable;
    };
    if follow_up.is_empty() {
        return Injection::NotApplicable;
    }

    let Some(parent_index) = questions
        .iter()
        .position(|question| question.id == verdict.question_id)
    else {
        return Injection::NotApplicable;
    };
    let parent_id = questions[parent_index].id.clone();

    if let Some(existing) = questions.iter().find(|question| {
        question.parent_id() == Some(parent_id.as_str()) && question.prompt == follow_up
    }) {
        return Injection::AlreadyPresent {
            question_id: existing.id.clone(),
        };
    }

    let sibling_count = questions
        .iter()
        .filter(|question| question.parent_id() == Some(parent_id.as_str()))
        .count();
    let question_id = format!("{}{}{}", parent_id, FOLLOW_UP_MARKER, sibling_count + 1);

    questions.insert(
        parent_index + 1,
        Question {
            id: question_id.clone(),
            prompt: follow_up.to_string(),
            kind: QuestionKind::Text,
            options: Vec::new(),
            required: true,
            probe_eligible: false,
        },
    );

    Injection::Inserted { question_id }
}
