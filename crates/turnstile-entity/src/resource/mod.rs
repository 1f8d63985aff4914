//! Capacity-bounded resources and the per-actor documents that hang off them.

pub mod model;
pub mod participant;
pub mod waitlist;

pub use model::Resource;
pub use participant::{Participant, ParticipantState};
pub use waitlist::WaitlistEntry;
