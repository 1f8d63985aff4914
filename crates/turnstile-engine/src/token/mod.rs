//! Single-use token issuing and redemption.

pub mod redeemer;

pub use redeemer::{Redemption, TokenRedeemer};
