//! Key generation, report decryption and batch retrieval for offline-finding accessories
//! tracked through a haystack-style relay.

#![warn(missing_docs)]

/// A tracked accessory's identity: its key pair and relay identifier.
pub mod accessory;
/// All error types.
pub mod error;
#[cfg(test)]
mod finder;
/// The owner side: decrypting reports.
pub mod owner;
/// Keys, curve operations and the report wire format.
pub mod protocol;
/// Talking to the relay and decrypting its responses in bulk.
pub mod server;

pub use p224;

pub use accessory::{generate, generate_until_valid, DeviceIdentity};
pub use owner::decrypt;
pub use server::{fetch_and_decrypt, BatchOutcome, ReportBatch, ReportFetcher};
