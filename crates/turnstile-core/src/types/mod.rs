//! Core type definitions used across the Turnstile workspace.

pub mod id;

pub use id::*;
