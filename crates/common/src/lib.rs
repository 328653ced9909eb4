//! Transit-encryption contract and errors shared across the `fieldvault` crates.

pub mod error;
pub mod transit;

pub use error::{TransitError, TransitItemError};
pub use transit::{BatchOutcome, TransitClient, TransitItem};
