mod device;

pub use device::{decrypt, OwnerDevice};
