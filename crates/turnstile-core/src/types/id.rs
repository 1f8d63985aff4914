//! Newtype wrappers around [`uuid::Uuid`] for every identity the engines
//! accept or produce.
//!
//! Distinct types keep a `TokenId` from being passed where a `ResourceId`
//! is expected. The nil UUID is never a valid identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Macro to define a newtype ID wrapper around `Uuid`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Return a reference to the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Reject the nil UUID.
            pub fn ensure_valid(&self) -> Result<(), AppError> {
                if self.0.is_nil() {
                    return Err(AppError::validation(concat!($label, " must not be nil")));
                }
                Ok(())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id = Uuid::parse_str(s).map(Self).map_err(|e| {
                    AppError::with_source(
                        crate::error::ErrorKind::Validation,
                        format!(concat!("Invalid ", $label, " '{}'"), s),
                        e,
                    )
                })?;
                id.ensure_valid()?;
                Ok(id)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a capacity-bounded resource (e.g. an event).
    ResourceId, "resource id"
);

define_id!(
    /// Identifier of an actor making requests (e.g. a user).
    ActorId, "actor id"
);

define_id!(
    /// Identifier of a single-use redeemable token.
    TokenId, "token id"
);

define_id!(
    /// Identifier of the side-effecting record produced under an idempotency key.
    ResultId, "result id"
);

impl ResultId {
    /// Create a time-ordered identifier for a freshly produced result.
    pub fn new_ordered() -> Self {
        Self(Uuid::now_v7())
    }
}
