//! Question domain module.
//!
//! This module contains the question model, the survey configuration
//! container, and the follow-up injector that grows the question sequence
//! from probe verdicts.
//!
//! # Module Structure
//!
//! - `model`: Question and config types (`Question`, `QuestionKind`, `SurveyConfig`)
//! - `followup`: Derived-question synthesis and injection

mod followup;
mod model;

// Re-export public API
pub use followup::{Injection, inject_follow_up};
pub use model::{FOLLOW_UP_MARKER, Question, QuestionKind, SurveyConfig};
