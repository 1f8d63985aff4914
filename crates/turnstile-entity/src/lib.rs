//! # turnstile-entity
//!
//! Document models for Turnstile. Every struct in this crate is the body of
//! one document in the transactional store; [`keys`] builds the key each
//! document lives under. All state machines are tagged enums.

pub mod idempotency;
pub mod keys;
pub mod resource;
pub mod token;
