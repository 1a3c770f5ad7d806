//! Request throttling.
//!
//! Every LLM-calling request passes the gate before it is issued. The
//! registry holds the process-wide per-session counters (the only mutable
//! state shared across request handlers); the gate layers the admission
//! policy on top: an origin-wide ceiling first, then the per-session
//! limit.
//!
//! # Module Structure
//!
//! - `registry`: per-identity timestamp accounting (`SessionRegistry`)
//! - `gate`: admission policy, status query and sweep task (`ThrottleGate`)

mod gate;
mod registry;

// Re-export public API
pub use gate::{ThrottleConfig, ThrottleGate, ThrottleStatus};
pub use registry::{Admission, SessionRegistry};
