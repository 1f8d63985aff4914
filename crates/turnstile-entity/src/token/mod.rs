//! Single-use redeemable tokens.

pub mod model;
pub mod status;

pub use model::RedeemableToken;
pub use status::TokenStatus;
