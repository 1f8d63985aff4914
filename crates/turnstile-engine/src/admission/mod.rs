//! Bounded admission with a FIFO waitlist.

pub mod engine;
pub mod sequence;

pub use engine::{AdmissionEngine, AdmissionOutcome};
