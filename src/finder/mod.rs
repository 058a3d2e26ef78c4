//! Finder-side report encryption. Only built for tests, where it produces reference payloads.

mod device;

pub use device::{encode_location, seal_report};
