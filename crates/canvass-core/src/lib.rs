//! Core domain layer for Canvass, the LLM-assisted survey probing system.
//!
//! This crate holds everything below the orchestration layer: the question
//! and answer models, the validation verdict, the response interpreter, the
//! follow-up injector, the prompt template, the throttling registry and
//! gate, and the abstract completion capability. The application crate
//! (`canvass-application`) wires these into the validation orchestrator.

pub mod answer;
pub mod completion;
pub mod error;
pub mod interpret;
pub mod prompt;
pub mod question;
pub mod throttle;
pub mod verdict;

// Re-export common error type
pub use error::{CanvassError, Result, ThrottleScope};
