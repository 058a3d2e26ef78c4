mod data;
mod location;
mod payload;

pub use data::{DecryptedReport, LocationRecord};
pub use location::{Coordinate, Location, LOCATION_LEN};
pub use payload::{
    seen_at, EncryptedReport, ENCRYPTED_LOCATION_LEN, EPHEMERAL_KEY_LEN,
    REFERENCE_DATE_OFFSET_SECONDS,
};
