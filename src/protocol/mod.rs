mod aes;
mod curve;
mod key;
mod report;

pub use aes::{open_in_place, Aes, TAG_LEN};
pub use curve::{CurveError, EllipticCurve, P224};
pub use key::{AdvertisementKey, PrivateKey, KEY_LEN};
pub use report::{
    seen_at, Coordinate, DecryptedReport, EncryptedReport, Location, LocationRecord,
    ENCRYPTED_LOCATION_LEN, EPHEMERAL_KEY_LEN, LOCATION_LEN, REFERENCE_DATE_OFFSET_SECONDS,
};
