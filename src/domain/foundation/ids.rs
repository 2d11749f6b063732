//! Strongly-typed identifier value objects.
//!
//! Vendor and store identifiers come from the surrounding marketplace
//! (document ids, not UUIDs we mint), and payment references are minted by
//! the gateway, so all three are validated non-blank strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fails when the value is empty or only whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// A seller account.
    VendorId,
    "vendor_id"
);

string_id!(
    /// The store a vendor owns (1:1).
    StoreId,
    "store_id"
);

string_id!(
    /// Gateway-assigned reference of a single charge.
    ///
    /// The idempotency key for payment events: a reference is applied to a
    /// subscription at most once.
    PaymentReference,
    "reference"
);
