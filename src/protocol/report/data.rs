use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Location;

/// What decrypting one payload yields, before any relay metadata is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecryptedReport {
    /// When the finder saw the accessory.
    pub timestamp: DateTime<Utc>,
    /// Confidence percentage reported alongside the fix.
    pub confidence: u8,
    /// The decrypted fix.
    pub location: Location,
}

/// A decrypted location fix together with the relay's metadata for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// When the finder saw the accessory.
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub location: Location,
    /// Confidence percentage reported alongside the fix.
    pub confidence_percent: u8,
    /// When the relay received the report.
    pub date_published: DateTime<Utc>,
    /// Free-form text from the relay.
    pub description: String,
    /// Per-result status from the relay.
    pub status_code: i64,
}

impl LocationRecord {
    /// Attach the relay's metadata to a decrypted report.
    pub fn new(
        report: DecryptedReport,
        date_published: DateTime<Utc>,
        description: String,
        status_code: i64,
    ) -> Self {
        Self {
            timestamp: report.timestamp,
            location: report.location,
            confidence_percent: report.confidence,
            date_published,
            description,
            status_code,
        }
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.location.latitude.degrees()
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.location.longitude.degrees()
    }

    /// Horizontal accuracy in meters.
    pub fn accuracy_meters(&self) -> u8 {
        self.location.accuracy_meters
    }
}
