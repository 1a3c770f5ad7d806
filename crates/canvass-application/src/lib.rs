//! Application layer for Canvass.
//!
//! This crate provides the validation orchestrator that coordinates the
//! core domain pieces (throttling gate, response interpreter, follow-up
//! injector, answer state) into the survey probing flow.

pub mod run;
pub mod validation;

pub use run::{SubmissionBlocker, SubmissionCheck, SurveyRun};
pub use validation::{
    QuestionResult, SubmissionOutcome, TriggerMode, ValidationConfig, ValidationService,
};
