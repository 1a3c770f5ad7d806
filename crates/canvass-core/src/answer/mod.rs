//! Answer domain module.
//!
//! This module contains the answer value and validation-state models plus
//! the mutable answer sheet a survey run operates on.
//!
//! # Module Structure
//!
//! - `model`: Answer value and status types (`AnswerValue`, `ValidationStatus`, `Answer`)
//! - `sheet`: Mutable per-run answer state (`AnswerSheet`)

mod model;
mod sheet;

// Re-export public API
pub use model::{Answer, AnswerValue, ValidationStatus};
pub use sheet::{AnswerSheet, VerdictApplication};
