use serde::Serialize;

/// Length of the decrypted location fix.
pub const LOCATION_LEN: usize = 10;

/// The location information included in offline finding reports.
#[derive(Serialize, PartialEq, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude geographical coordinate.
    pub latitude: Coordinate,
    /// Longitude geographical coordinate.
    pub longitude: Coordinate,
    /// Horizontal accuracy of the fix, in meters.
    pub accuracy_meters: u8,
    /// Byte encoding the status of the accessory, as included in the BLE advertisement.
    pub status: u8,
}

/// A geographical coordinate in degrees.
#[derive(Serialize, PartialEq, PartialOrd, Debug, Clone, Copy)]
#[serde(transparent)]
pub struct Coordinate(pub f64);

impl Coordinate {
    /// Deserialize a coordinate from FindMy's canonical 4-byte representation.
    fn from_bytes(bytes: [u8; 4]) -> Self {
        let int = i32::from_be_bytes(bytes);
        Self(f64::from(int) / 10_000_000.0)
    }

    /// The coordinate in decimal degrees.
    pub fn degrees(self) -> f64 {
        self.0
    }
}

impl Location {
    /// Deserialize the location from FindMy's canonical 10-byte representation.
    pub fn from_bytes(bytes: &[u8; LOCATION_LEN]) -> Self {
        Self {
            latitude: Coordinate::from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            longitude: Coordinate::from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            accuracy_meters: bytes[8],
            status: bytes[9],
        }
    }
}
